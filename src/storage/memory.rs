use std::{collections::HashMap, sync::Arc};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::sync::RwLock;

use super::{BoxStream, FileMeta, StorageEngine, StoredFile, MAX_NAME_ATTEMPTS};
use crate::{
    config::UploadConfig,
    sanitize::{FilenameSanitizer, StoredFilename},
    ConfigError, StorageError, UploadError,
};

/// In-memory storage engine keyed by stored filename.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: Arc<RwLock<HashMap<StoredFilename, Bytes>>>,
    sanitizer: FilenameSanitizer,
}

impl MemoryStorage {
    /// Creates an empty in-memory storage backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend naming files with `sanitizer`.
    pub fn with_sanitizer(sanitizer: FilenameSanitizer) -> Self {
        Self {
            files: Arc::default(),
            sanitizer,
        }
    }

    /// Returns stored bytes for a previously stored filename.
    pub async fn get(&self, filename: &StoredFilename) -> Option<Bytes> {
        self.files.read().await.get(filename).cloned()
    }

    /// Returns the current number of stored objects.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    /// Returns `true` when no payloads are currently stored.
    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl StorageEngine for MemoryStorage {
    fn configure(&mut self, config: &UploadConfig) -> Result<(), ConfigError> {
        self.sanitizer = self.sanitizer.with_policy(config.filename.clone())?;
        Ok(())
    }

    async fn store(
        &self,
        meta: &FileMeta,
        mut stream: BoxStream<'_, Result<Bytes, UploadError>>,
    ) -> Result<StoredFile, UploadError> {
        let mut body = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        let body = body.freeze();
        let size = body.len() as u64;

        let mut files = self.files.write().await;
        let filename = (0..MAX_NAME_ATTEMPTS)
            .map(|_| self.sanitizer.sanitize(meta.original_name.as_deref()))
            .find(|candidate| !files.contains_key(candidate))
            .ok_or_else(|| {
                StorageError::new(format!(
                    "no free filename after {MAX_NAME_ATTEMPTS} attempts"
                ))
            })?;
        files.insert(filename.clone(), body);
        drop(files);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            field_name = meta.field_name.as_str(),
            filename = filename.as_str(),
            size = size,
            "memory storage: completed store"
        );

        Ok(StoredFile {
            filename,
            field_name: meta.field_name.clone(),
            original_name: meta.original_name.clone(),
            content_type: meta.content_type(),
            size,
            path: None,
        })
    }

    async fn remove(&self, file: &StoredFile) -> Result<(), UploadError> {
        match self.files.write().await.remove(&file.filename) {
            Some(_) => Ok(()),
            None => Err(StorageError::new(format!(
                "no stored file named `{}`",
                file.filename
            ))
            .into()),
        }
    }
}
