//! Axum integration helpers.

use std::collections::HashMap;

use axum::{
    extract::multipart::{Multipart, MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::StreamExt;

use crate::{FileMeta, StorageEngine, StoredFile, Upload, UploadError};

const DEFAULT_PART_CONTENT_TYPE: &str = "application/octet-stream";

/// Text fields and stored files collected from one multipart request.
#[derive(Debug, Clone, Default)]
pub struct UploadedForm {
    /// Text fields by name. A repeated name keeps the last value.
    pub fields: HashMap<String, String>,
    /// Files stored in arrival order.
    pub files: Vec<StoredFile>,
}

impl UploadedForm {
    /// Returns the value of a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns the first stored file received under `field_name`.
    pub fn file(&self, field_name: &str) -> Option<&StoredFile> {
        self.files.iter().find(|file| file.field_name == field_name)
    }
}

/// Rejection type returned by the Axum integration.
#[derive(Debug)]
pub struct UploadRejection(pub UploadError);

impl From<UploadError> for UploadRejection {
    fn from(err: UploadError) -> Self {
        Self(err)
    }
}

impl IntoResponse for UploadRejection {
    fn into_response(self) -> Response {
        (status_for(&self.0), self.0.to_string()).into_response()
    }
}

/// Maps an upload error to the HTTP status reported to the client.
pub fn status_for(err: &UploadError) -> StatusCode {
    match err {
        UploadError::OnlyImagesAllowed { .. }
        | UploadError::MimeTypeNotAllowed { .. }
        | UploadError::FilesLimitExceeded { .. }
        | UploadError::Parse { .. } => StatusCode::BAD_REQUEST,
        UploadError::FileSizeLimitExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::Config(_) | UploadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Reads every part of `multipart`, storing file parts through `upload`.
///
/// Parts carrying a filename are files; all others are collected as text.
/// On any failure the files already stored for this request are removed.
pub async fn store_multipart<S>(
    upload: &Upload<S>,
    multipart: &mut Multipart,
) -> Result<UploadedForm, UploadError>
where
    S: StorageEngine,
{
    let mut form = UploadedForm::default();

    match collect_parts(upload, multipart, &mut form).await {
        Ok(()) => Ok(form),
        Err(err) => {
            for stored in &form.files {
                if let Err(_cleanup) = upload.remove(stored).await {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        filename = stored.filename.as_str(),
                        error = %_cleanup,
                        "axum: failed to remove file after rejected request"
                    );
                }
            }
            Err(err)
        }
    }
}

async fn collect_parts<S>(
    upload: &Upload<S>,
    multipart: &mut Multipart,
    form: &mut UploadedForm,
) -> Result<(), UploadError>
where
    S: StorageEngine,
{
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_owned();

        let Some(original_name) = field.file_name().map(ToOwned::to_owned) else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(field_name, value);
            continue;
        };

        if let Some(max_files) = upload.limits().files {
            if form.files.len() >= max_files {
                return Err(UploadError::FilesLimitExceeded { max_files });
            }
        }

        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_PART_CONTENT_TYPE)
            .to_owned();
        let meta = FileMeta::new(field_name, Some(&original_name), content_type);
        let body = field.map(|chunk| chunk.map_err(multipart_error));

        let stored = upload.store(meta, body).await?;
        form.files.push(stored);
    }

    Ok(())
}

fn multipart_error(err: MultipartError) -> UploadError {
    UploadError::parse(format!("multipart read failed: {err}"))
}
