use thiserror::Error;

/// Configuration-time validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The upload destination directory was empty.
    #[error("upload destination path cannot be empty")]
    EmptyDestination,
    /// A configured numeric limit must be strictly greater than zero.
    #[error("limit `{limit}` must be greater than 0")]
    InvalidLimitValue {
        /// Name of the limit.
        limit: &'static str,
    },
    /// The placeholder base name would not survive sanitization unchanged.
    #[error("placeholder base name `{placeholder}` must be non-empty and use only [A-Za-z0-9_@-]")]
    InvalidPlaceholder {
        /// The rejected placeholder value.
        placeholder: String,
    },
    /// An allowed extension is empty, upper-case, or contains non-alphanumerics.
    #[error("invalid allowed extension `{extension}`")]
    InvalidExtension {
        /// The rejected extension value.
        extension: String,
    },
    /// An allowed MIME pattern is malformed.
    #[error("invalid MIME pattern `{pattern}`")]
    InvalidMimePattern {
        /// The invalid pattern value.
        pattern: String,
    },
    /// An environment variable held a value that could not be parsed.
    #[error("environment variable `{name}` has invalid value `{value}`")]
    InvalidEnvValue {
        /// Variable name.
        name: &'static str,
        /// Raw value read from the environment.
        value: String,
    },
}

/// Storage backend failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Generic storage failure with message context.
    #[error("{message}")]
    Message {
        /// Storage failure message.
        message: String,
    },
}

impl StorageError {
    /// Creates a storage error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Runtime error type used by `sweetshop-upload`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UploadError {
    /// Configuration error surfaced at runtime.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Storage backend failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The incoming request body could not be read.
    #[error("{message}")]
    Parse {
        /// Read failure message.
        message: String,
    },
    /// The declared content type is not an `image/*` type.
    #[error("Only image files are allowed!")]
    OnlyImagesAllowed {
        /// Field name carrying the rejected file.
        field: String,
        /// Declared content type of the rejected file.
        mime: String,
    },
    /// The declared content type is not in the configured allow-list.
    #[error("file field `{field}` has disallowed MIME type `{mime}`")]
    MimeTypeNotAllowed {
        /// Field name carrying the rejected file.
        field: String,
        /// Declared content type of the rejected file.
        mime: String,
    },
    /// A file exceeded the configured size limit.
    #[error("file field `{field}` exceeded max file size of {max_file_size} bytes")]
    FileSizeLimitExceeded {
        /// Field name that exceeded the file-size limit.
        field: String,
        /// Maximum allowed file size in bytes.
        max_file_size: u64,
    },
    /// The number of file parts exceeded the configured limit.
    #[error("upload request exceeded max files limit of {max_files}")]
    FilesLimitExceeded {
        /// Maximum allowed number of file parts.
        max_files: usize,
    },
}

impl UploadError {
    /// Creates a read failure from a message.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Returns `true` when the file was refused by the MIME filter.
    pub fn is_mime_rejection(&self) -> bool {
        matches!(
            self,
            Self::OnlyImagesAllowed { .. } | Self::MimeTypeNotAllowed { .. }
        )
    }
}
