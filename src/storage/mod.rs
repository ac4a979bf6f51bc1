//! Storage engine abstractions and built-in implementations.

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

use crate::{config::UploadConfig, sanitize::StoredFilename, ConfigError, UploadError};

/// Disk-backed storage backend implementation.
pub mod disk;
/// In-memory storage backend implementation.
pub mod memory;
pub use disk::{DiskStorage, DiskStorageBuilder};
pub use memory::MemoryStorage;

/// Fresh names drawn before a store gives up on finding a free one.
pub(crate) const MAX_NAME_ATTEMPTS: usize = 8;

/// Boxed stream type used by storage backends.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Descriptor of one incoming file, known before its bytes arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    /// Multipart field name.
    pub field_name: String,
    /// Client-supplied filename, when present. Untrusted.
    pub original_name: Option<String>,
    /// Client-declared content type. Untrusted.
    pub declared_mime_type: String,
}

impl FileMeta {
    /// Creates a file descriptor.
    pub fn new(
        field_name: impl Into<String>,
        original_name: Option<&str>,
        declared_mime_type: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            original_name: original_name.map(ToOwned::to_owned),
            declared_mime_type: declared_mime_type.into(),
        }
    }

    /// Parses the declared content type, falling back to `application/octet-stream`.
    pub fn content_type(&self) -> mime::Mime {
        self.declared_mime_type
            .parse::<mime::Mime>()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
    }
}

/// Metadata describing a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated filename the bytes were stored under.
    pub filename: StoredFilename,
    /// Multipart field name.
    pub field_name: String,
    /// Client-supplied filename, when present.
    pub original_name: Option<String>,
    /// Declared content type of the upload.
    pub content_type: mime::Mime,
    /// Persisted file size in bytes.
    pub size: u64,
    /// Final filesystem path when stored on disk.
    pub path: Option<std::path::PathBuf>,
}

impl StoredFile {
    /// Joins the stored filename onto a public URL prefix such as `/uploads`.
    pub fn public_url(&self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.filename)
    }
}

/// Async trait abstraction for file storage backends.
#[async_trait::async_trait]
pub trait StorageEngine: Send + Sync + 'static {
    /// Adopts the destination and naming policy of `config`.
    ///
    /// Called by [`Upload::with_storage`](crate::Upload::with_storage) so that
    /// the engine places and names files the way the configuration says.
    /// Engines without a notion of either keep the default no-op.
    fn configure(&mut self, config: &UploadConfig) -> Result<(), ConfigError> {
        let _ = config;
        Ok(())
    }

    /// Persists a file stream and returns its stored metadata.
    ///
    /// Errors yielded by `stream` must be returned unchanged, and nothing may
    /// remain stored when the stream fails.
    async fn store(
        &self,
        meta: &FileMeta,
        stream: BoxStream<'_, Result<Bytes, UploadError>>,
    ) -> Result<StoredFile, UploadError>;

    /// Removes a previously stored file.
    async fn remove(&self, file: &StoredFile) -> Result<(), UploadError>;
}
