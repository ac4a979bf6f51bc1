#![allow(missing_docs)]

use std::{path::PathBuf, sync::Arc};

use bytes::Bytes;
use futures::stream;
use sweetshop_upload::{FileMeta, Upload, UploadError, DEFAULT_FILE_SIZE};
use uuid::Uuid;

#[tokio::test]
async fn product_image_flow_stores_and_reports_public_url() {
    let root = std::env::temp_dir().join(format!("sweetshop-e2e-{}", Uuid::new_v4()));
    let upload = Upload::builder()
        .destination(&root)
        .build()
        .expect("upload should build");

    assert_eq!(upload.limits().file_size, 5 * 1024 * 1024);
    assert_eq!(DEFAULT_FILE_SIZE, 5_242_880);

    let meta = FileMeta::new("image", Some("Rainbow Lollipop.JPEG"), "image/jpeg");
    assert!(upload.file_filter(&meta).is_ok());
    assert_eq!(upload.storage().destination(&meta), root.as_path());

    let stored = upload
        .store(meta, stream::iter([Ok::<_, UploadError>(Bytes::from_static(b"\xFF\xD8\xFF"))]))
        .await
        .expect("store should succeed");

    let url = stored.public_url("/uploads/");
    assert!(url.starts_with("/uploads/Rainbow-Lollipop-"));
    assert!(url.ends_with(".jpeg"));
    assert_eq!(stored.path.as_deref(), Some(root.join(&stored.filename).as_path()));

    let _ = tokio::fs::remove_dir_all(root).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_of_the_same_name_do_not_collide() {
    let root: PathBuf = std::env::temp_dir().join(format!("sweetshop-e2e-{}", Uuid::new_v4()));
    let upload = Arc::new(
        Upload::builder()
            .destination(&root)
            .build()
            .expect("upload should build"),
    );

    let tasks: Vec<_> = (0..32u8)
        .map(|index| {
            let upload = Arc::clone(&upload);
            tokio::spawn(async move {
                let meta = FileMeta::new("image", Some("same.png"), "image/png");
                let body = stream::iter([Ok::<_, UploadError>(Bytes::from(vec![index; 16]))]);
                upload.store(meta, body).await
            })
        })
        .collect();

    let mut names = Vec::new();
    for task in tasks {
        let stored = task.await.expect("task should join").expect("store should succeed");
        names.push(stored.filename);
    }
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 32);

    let _ = tokio::fs::remove_dir_all(root).await;
}
