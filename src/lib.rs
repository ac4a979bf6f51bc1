#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Image upload policy for the Sweet Shop backend.
//!
//! An [`Upload`] composes a declared content-type filter, a fixed destination
//! directory, a filename sanitizer and a per-file size limit, and streams
//! accepted files into a [`StorageEngine`].

/// Fluent builder API.
pub mod builder;
/// Upload policy configuration.
pub mod config;
/// Fixed upload directory resolution.
pub mod destination;
/// Error types exposed by this crate.
pub mod error;
/// Declared content-type filtering.
pub mod filter;
/// Size and count limits.
pub mod limits;
/// Stored filename sanitizing.
pub mod sanitize;
/// Storage engine traits and implementations.
pub mod storage;

mod limited;

#[cfg(feature = "axum")]
pub mod axum;

use bytes::Bytes;
use futures::Stream;

pub use builder::UploadBuilder;
pub use config::UploadConfig;
pub use destination::Destination;
pub use error::{ConfigError, StorageError, UploadError};
pub use filter::MimeFilter;
pub use limits::{Limits, DEFAULT_FILE_SIZE};
pub use sanitize::{
    sanitize, FilenamePolicy, FilenameSanitizer, RandomTokens, SequentialTokens, StoredFilename,
    TokenSource,
};
pub use storage::{
    BoxStream, DiskStorage, DiskStorageBuilder, FileMeta, MemoryStorage, StorageEngine, StoredFile,
};

use limited::SizeLimited;

/// Upload orchestrator: filter, limits and storage for one upload policy.
#[derive(Debug, Clone)]
pub struct Upload<S = DiskStorage> {
    config: UploadConfig,
    storage: S,
}

impl Upload<DiskStorage> {
    /// Creates a fluent builder with the default policy.
    pub fn builder() -> UploadBuilder {
        UploadBuilder::default()
    }

    /// Creates a disk-backed upload from validated configuration.
    pub fn from_config(config: UploadConfig) -> Result<Self, UploadError> {
        config.validate()?;
        let storage = DiskStorage::from_config(&config)?;
        Ok(Self { config, storage })
    }
}

impl<S> Upload<S> {
    /// Returns an immutable reference to the active configuration.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Returns an immutable reference to the configured storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the active limits.
    pub fn limits(&self) -> &Limits {
        &self.config.limits
    }

    /// Decides whether a file may be stored, based on its declared content type.
    pub fn file_filter(&self, meta: &FileMeta) -> Result<(), UploadError> {
        self.config.mime_filter.check(meta)
    }
}

impl<S> Upload<S>
where
    S: StorageEngine,
{
    /// Creates an upload with an explicit storage backend and validated configuration.
    ///
    /// The backend adopts the destination and naming policy of `config` through
    /// [`StorageEngine::configure`].
    pub fn with_storage(mut storage: S, config: UploadConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        storage.configure(&config)?;
        Ok(Self { config, storage })
    }

    /// Filters, size-limits and stores one file.
    ///
    /// A rejected file is never handed to storage. A file exceeding
    /// `limits.file_size` fails with [`UploadError::FileSizeLimitExceeded`].
    pub async fn store<B>(&self, meta: FileMeta, body: B) -> Result<StoredFile, UploadError>
    where
        B: Stream<Item = Result<Bytes, UploadError>> + Send,
    {
        self.file_filter(&meta)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            field_name = meta.field_name.as_str(),
            original_name = meta.original_name.as_deref().unwrap_or("<none>"),
            max_file_size = self.config.limits.file_size,
            "upload: file accepted by filter"
        );

        let limited = SizeLimited::new(body, meta.field_name.as_str(), self.config.limits.file_size);
        let stream: BoxStream<'_, Result<Bytes, UploadError>> = Box::pin(limited);
        self.storage.store(&meta, stream).await
    }

    /// Removes a file stored earlier through this upload.
    pub async fn remove(&self, file: &StoredFile) -> Result<(), UploadError> {
        self.storage.remove(file).await
    }
}
