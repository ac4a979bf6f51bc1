//! Minimal product-creation endpoint storing a sweet's image.
//!
//! Run with `cargo run --example sweet_image_upload --features axum`, then:
//! `curl -F name=Toffee -F price=1.20 -F image=@toffee.png localhost:3000/api/sweets`

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    routing::post,
    Router,
};
use sweetshop_upload::{
    axum::{store_multipart, UploadRejection},
    Upload, UploadConfig,
};
use tracing_subscriber::EnvFilter;

type AppState = Arc<Upload>;

async fn create_sweet(
    State(upload): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, UploadRejection> {
    let form = store_multipart(&upload, &mut multipart).await?;

    let name = form.text("name").unwrap_or("unnamed sweet");
    let image_url = form
        .file("image")
        .map(|file| file.public_url("/uploads"))
        .unwrap_or_default();

    tracing::info!(name, image_url = image_url.as_str(), "sweet created");
    Ok(format!("created {name} with image {image_url}\n"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sweetshop_upload=debug")),
        )
        .init();

    let upload = Upload::from_config(UploadConfig::from_env()?)?;
    let app = Router::new()
        .route("/api/sweets", post(create_sweet))
        .with_state(Arc::new(upload));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!(addr = "127.0.0.1:3000", "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
