use std::path::{Path, PathBuf};

use crate::{error::StorageError, storage::FileMeta};

/// Fixed upload directory shared by every accepted file.
///
/// Resolution ignores the request entirely: no client-supplied value ever
/// becomes part of the directory path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    root: PathBuf,
}

impl Destination {
    /// Creates a resolver for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the configured directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the directory for an upload.
    pub fn resolve(&self, _meta: &FileMeta) -> &Path {
        &self.root
    }

    /// Creates the directory (and parents) when missing.
    pub async fn prepare(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| StorageError::new(format!("failed to create upload directory: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_same_directory_for_every_request() {
        let destination = Destination::new("uploads");
        let hostile = FileMeta::new("image", Some("../../etc/passwd"), "image/png");
        let plain = FileMeta::new("image", None, "image/jpeg");

        assert_eq!(destination.resolve(&hostile), Path::new("uploads"));
        assert_eq!(destination.resolve(&plain), destination.root());
    }
}
