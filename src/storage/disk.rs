use std::{
    fmt, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use futures::StreamExt;
use tokio::{fs::File, io::AsyncWriteExt};

use super::{BoxStream, FileMeta, StorageEngine, StoredFile, MAX_NAME_ATTEMPTS};
use crate::{
    config::UploadConfig,
    destination::Destination,
    sanitize::{FilenamePolicy, FilenameSanitizer, RandomTokens, StoredFilename, TokenSource},
    ConfigError, StorageError, UploadError,
};

/// Builder for [`DiskStorage`].
#[derive(Clone)]
pub struct DiskStorageBuilder {
    root: PathBuf,
    policy: FilenamePolicy,
    tokens: Arc<dyn TokenSource>,
}

impl fmt::Debug for DiskStorageBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskStorageBuilder")
            .field("root", &self.root)
            .field("policy", &self.policy)
            .field("tokens", &"<source>")
            .finish()
    }
}

impl DiskStorageBuilder {
    /// Sets the directory used for persisted files.
    pub fn destination(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Adopts the naming policy and token source of `sanitizer`.
    pub fn sanitizer(mut self, sanitizer: FilenameSanitizer) -> Self {
        self.policy = sanitizer.policy().clone();
        self.tokens = sanitizer.tokens();
        self
    }

    /// Sets the naming policy, keeping the current token source.
    pub fn policy(mut self, policy: FilenamePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the token source, keeping the current naming policy.
    pub fn tokens<T>(mut self, tokens: T) -> Self
    where
        T: TokenSource,
    {
        self.tokens = Arc::new(tokens);
        self
    }

    /// Builds a validated disk storage backend.
    ///
    /// Fails on an empty root or a naming policy that does not validate.
    pub fn build(self) -> Result<DiskStorage, ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDestination);
        }

        Ok(DiskStorage {
            destination: Destination::new(self.root),
            sanitizer: FilenameSanitizer::from_shared(self.policy, self.tokens)?,
        })
    }
}

impl Default for DiskStorageBuilder {
    fn default() -> Self {
        Self {
            root: PathBuf::from(crate::config::DEFAULT_DESTINATION),
            policy: FilenamePolicy::default(),
            tokens: Arc::new(RandomTokens),
        }
    }
}

/// Disk-backed storage engine writing every file into one fixed directory.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    destination: Destination,
    sanitizer: FilenameSanitizer,
}

impl DiskStorage {
    /// Creates a disk storage builder.
    pub fn builder() -> DiskStorageBuilder {
        DiskStorageBuilder::default()
    }

    /// Creates disk storage from the destination and naming policy of `config`.
    pub fn from_config(config: &UploadConfig) -> Result<Self, ConfigError> {
        Self::builder()
            .destination(config.destination.clone())
            .policy(config.filename.clone())
            .build()
    }

    /// Returns the directory an upload will be written to.
    pub fn destination(&self, meta: &FileMeta) -> &Path {
        self.destination.resolve(meta)
    }

    /// Generates a fresh stored filename for an upload.
    pub fn filename(&self, meta: &FileMeta) -> StoredFilename {
        self.sanitizer.sanitize(meta.original_name.as_deref())
    }

    /// Returns the filename sanitizer in use.
    pub fn sanitizer(&self) -> &FilenameSanitizer {
        &self.sanitizer
    }

    async fn create_unique(
        &self,
        meta: &FileMeta,
    ) -> Result<(StoredFilename, PathBuf, File), StorageError> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let filename = self.filename(meta);
            let path = self.destination(meta).join(&filename);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((filename, path, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        path = %path.display(),
                        "disk storage: name collision, drawing a new filename"
                    );
                }
                Err(err) => {
                    return Err(StorageError::new(format!(
                        "failed to create output file: {err}"
                    )))
                }
            }
        }

        Err(StorageError::new(format!(
            "no free filename after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }
}

#[async_trait::async_trait]
impl StorageEngine for DiskStorage {
    fn configure(&mut self, config: &UploadConfig) -> Result<(), ConfigError> {
        if config.destination.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDestination);
        }
        self.sanitizer = self.sanitizer.with_policy(config.filename.clone())?;
        self.destination = Destination::new(config.destination.clone());
        Ok(())
    }

    async fn store(
        &self,
        meta: &FileMeta,
        mut stream: BoxStream<'_, Result<Bytes, UploadError>>,
    ) -> Result<StoredFile, UploadError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            field_name = meta.field_name.as_str(),
            original_name = meta.original_name.as_deref().unwrap_or("<none>"),
            content_type = meta.declared_mime_type.as_str(),
            root = %self.destination.root().display(),
            "disk storage: begin streaming store"
        );

        self.destination.prepare().await?;
        let (filename, path, mut file) = self.create_unique(meta).await?;

        let written = match write_stream(&mut file, &mut stream).await {
            Ok(written) => written,
            Err(err) => {
                drop(file);
                remove_partial(&path).await;
                return Err(err);
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            field_name = meta.field_name.as_str(),
            filename = filename.as_str(),
            size = written,
            path = %path.display(),
            "disk storage: completed store"
        );

        Ok(StoredFile {
            filename,
            field_name: meta.field_name.clone(),
            original_name: meta.original_name.clone(),
            content_type: meta.content_type(),
            size: written,
            path: Some(path),
        })
    }

    async fn remove(&self, file: &StoredFile) -> Result<(), UploadError> {
        let path = self.destination.root().join(&file.filename);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|err| StorageError::new(format!("failed to remove stored file: {err}")).into())
    }
}

async fn write_stream(
    file: &mut File,
    stream: &mut BoxStream<'_, Result<Bytes, UploadError>>,
) -> Result<u64, UploadError> {
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        file.write_all(&bytes)
            .await
            .map_err(|err| StorageError::new(format!("failed to write output file: {err}")))?;
        written = written.saturating_add(bytes.len() as u64);
    }

    file.flush()
        .await
        .map_err(|err| StorageError::new(format!("failed to flush output file: {err}")))?;
    Ok(written)
}

async fn remove_partial(path: &Path) {
    if let Err(_err) = tokio::fs::remove_file(path).await {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            path = %path.display(),
            error = %_err,
            "disk storage: failed to remove partial file"
        );
    }
}
