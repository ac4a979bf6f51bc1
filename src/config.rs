use std::path::PathBuf;

use crate::{
    error::ConfigError,
    filter::{self, MimeFilter},
    limits::Limits,
    sanitize::FilenamePolicy,
};

/// Directory used when none is configured.
pub const DEFAULT_DESTINATION: &str = "uploads";

/// Environment variable naming the upload directory.
pub const ENV_UPLOAD_DIR: &str = "UPLOAD_DIR";
/// Environment variable holding the per-file size limit in bytes.
pub const ENV_MAX_FILE_SIZE: &str = "UPLOAD_MAX_FILE_SIZE";

/// Top-level upload policy.
///
/// Several policies can coexist in one process; nothing here is global.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Directory every accepted file is written to.
    pub destination: PathBuf,
    /// Size and count limits.
    pub limits: Limits,
    /// Stored filename rules.
    pub filename: FilenamePolicy,
    /// Declared content-type policy.
    pub mime_filter: MimeFilter,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from(DEFAULT_DESTINATION),
            limits: Limits::default(),
            filename: FilenamePolicy::default(),
            mime_filter: MimeFilter::default(),
        }
    }
}

impl UploadConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `UPLOAD_DIR` and `UPLOAD_MAX_FILE_SIZE`, keeping defaults for unset values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_UPLOAD_DIR).filter(|value| !value.trim().is_empty()) {
            config.destination = PathBuf::from(dir.trim());
        }

        if let Some(raw) = lookup(ENV_MAX_FILE_SIZE) {
            config.limits.file_size =
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidEnvValue {
                        name: ENV_MAX_FILE_SIZE,
                        value: raw.clone(),
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates every part of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.destination.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDestination);
        }

        if self.limits.file_size == 0 {
            return Err(ConfigError::InvalidLimitValue { limit: "file_size" });
        }
        if self.limits.files == Some(0) {
            return Err(ConfigError::InvalidLimitValue { limit: "files" });
        }

        self.filename.validate()?;

        if let MimeFilter::Patterns(patterns) = &self.mime_filter {
            if let Some(pattern) = patterns.iter().find(|p| !filter::is_valid_pattern(p)) {
                return Err(ConfigError::InvalidMimePattern {
                    pattern: pattern.clone(),
                });
            }
        }

        Ok(())
    }
}
