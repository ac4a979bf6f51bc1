use std::{fmt, path::PathBuf, sync::Arc};

use crate::{
    config::UploadConfig,
    error::{ConfigError, UploadError},
    filter::MimeFilter,
    limits::Limits,
    sanitize::{FilenamePolicy, FilenameSanitizer, RandomTokens, TokenSource},
    storage::DiskStorage,
    Upload,
};

/// Builder for configuring an [`Upload`] backed by disk storage.
#[derive(Clone)]
pub struct UploadBuilder {
    config: UploadConfig,
    tokens: Arc<dyn TokenSource>,
}

impl fmt::Debug for UploadBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadBuilder")
            .field("config", &self.config)
            .field("tokens", &"<source>")
            .finish()
    }
}

impl Default for UploadBuilder {
    fn default() -> Self {
        Self {
            config: UploadConfig::default(),
            tokens: Arc::new(RandomTokens),
        }
    }
}

impl UploadBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current builder configuration snapshot.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Replaces the full builder configuration.
    pub fn with_config(mut self, config: UploadConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the upload directory.
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.config.destination = destination.into();
        self
    }

    /// Sets upload limits.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Sets the per-file size limit in bytes.
    pub fn file_size(mut self, file_size: u64) -> Self {
        self.config.limits.file_size = file_size;
        self
    }

    /// Sets the declared content-type policy.
    pub fn mime_filter(mut self, filter: MimeFilter) -> Self {
        self.config.mime_filter = filter;
        self
    }

    /// Sets the stored filename rules.
    pub fn filename_policy(mut self, policy: FilenamePolicy) -> Self {
        self.config.filename = policy;
        self
    }

    /// Draws filename tokens from `tokens` instead of the random default.
    pub fn tokens<T>(mut self, tokens: T) -> Self
    where
        T: TokenSource,
    {
        self.tokens = Arc::new(tokens);
        self
    }

    /// Validates builder configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()
    }

    /// Finalizes and returns validated configuration.
    pub fn build_config(self) -> Result<UploadConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Validates the configuration and builds a disk-backed [`Upload`].
    pub fn build(self) -> Result<Upload<DiskStorage>, UploadError> {
        self.config.validate()?;

        let sanitizer = FilenameSanitizer::from_shared(self.config.filename.clone(), self.tokens)?;
        let storage = DiskStorage::builder()
            .destination(self.config.destination.clone())
            .sanitizer(sanitizer)
            .build()?;

        Ok(Upload::with_storage(storage, self.config)?)
    }
}
