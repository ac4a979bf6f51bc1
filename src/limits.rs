/// Default per-file size limit: 5 MiB.
pub const DEFAULT_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Size and count limits enforced while receiving uploads.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum accepted size in bytes for a single file.
    pub file_size: u64,
    /// Maximum number of file parts accepted in one request.
    pub files: Option<usize>,
}

impl Limits {
    /// Creates the default limits: 5 MiB per file, no file count limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the per-file size limit replaced.
    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    /// Returns a copy with the per-request file count limit replaced.
    pub fn with_files(mut self, files: usize) -> Self {
        self.files = Some(files);
        self
    }

    /// Returns `true` when `size` bytes fit within the per-file limit.
    pub fn allows_file_size(&self, size: u64) -> bool {
        size <= self.file_size
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            file_size: DEFAULT_FILE_SIZE,
            files: None,
        }
    }
}
