//! Stored filename generation.
//!
//! Every untrusted original name maps to `<base>-<timestamp>-<suffix>[.<ext>]`.
//! The base keeps only ASCII alphanumerics, `-`, `_`, `@` and spaces (spaces
//! collapse to `-`), so traversal sequences, separators, shell metacharacters and
//! markup cannot reach the output. Sanitizing never fails.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, OnceLock,
    },
};

use uuid::Uuid;

use crate::error::ConfigError;

/// Base name used when nothing usable remains of the original name.
pub const PLACEHOLDER_BASE: &str = "file";
/// Extensions carried over from the original name by default.
pub const DEFAULT_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];
/// Default cap on the sanitized base length, in characters.
pub const DEFAULT_MAX_BASE_LEN: usize = 100;

const RANDOM_SUFFIX_SPACE: u128 = 1_000_000_000;

/// Sanitizes `original` with the default policy and random tokens.
pub fn sanitize(original: Option<&str>) -> StoredFilename {
    static DEFAULT: OnceLock<FilenameSanitizer> = OnceLock::new();
    DEFAULT.get_or_init(FilenameSanitizer::default).sanitize(original)
}

/// A filename safe to join onto the upload directory.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoredFilename(String);

impl StoredFilename {
    /// Returns the filename as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the lower-cased extension, when one was kept.
    pub fn extension(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StoredFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoredFilename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for StoredFilename {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl From<StoredFilename> for String {
    fn from(value: StoredFilename) -> Self {
        value.0
    }
}

/// Naming rules applied by [`FilenameSanitizer`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePolicy {
    /// Base name used when the original name yields nothing usable.
    pub placeholder: String,
    /// Lower-case extensions kept from the original name.
    pub allowed_extensions: Vec<String>,
    /// Maximum base length in characters.
    pub max_base_len: usize,
}

impl FilenamePolicy {
    /// Creates the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates placeholder, extensions and length cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let placeholder_ok = !self.placeholder.is_empty()
            && self
                .placeholder
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '@'));
        if !placeholder_ok {
            return Err(ConfigError::InvalidPlaceholder {
                placeholder: self.placeholder.clone(),
            });
        }

        if let Some(extension) = self.allowed_extensions.iter().find(|ext| {
            ext.is_empty()
                || !ext
                    .chars()
                    .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit())
        }) {
            return Err(ConfigError::InvalidExtension {
                extension: extension.clone(),
            });
        }

        if self.max_base_len == 0 {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_base_len",
            });
        }

        Ok(())
    }

    fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.iter().any(|allowed| allowed == extension)
    }
}

impl Default for FilenamePolicy {
    fn default() -> Self {
        Self {
            placeholder: PLACEHOLDER_BASE.to_owned(),
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|ext| (*ext).to_owned()).collect(),
            max_base_len: DEFAULT_MAX_BASE_LEN,
        }
    }
}

/// Source of the two disambiguating tokens appended to every stored filename.
pub trait TokenSource: Send + Sync + 'static {
    /// Coarse wall-clock component.
    fn timestamp(&self) -> u64;
    /// Second distinguishing component.
    fn suffix(&self) -> u64;
}

/// Millisecond timestamp plus a random suffix below one billion.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn timestamp(&self) -> u64 {
        unix_millis()
    }

    fn suffix(&self) -> u64 {
        (Uuid::new_v4().as_u128() % RANDOM_SUFFIX_SPACE) as u64
    }
}

/// Millisecond timestamp plus a monotonic counter.
///
/// Names drawn from one instance never repeat, even within a millisecond.
#[derive(Debug, Default)]
pub struct SequentialTokens {
    next: AtomicU64,
}

impl SequentialTokens {
    /// Creates a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter starting at `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl TokenSource for SequentialTokens {
    fn timestamp(&self) -> u64 {
        unix_millis()
    }

    fn suffix(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

fn unix_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Maps untrusted original filenames to [`StoredFilename`]s.
#[derive(Clone)]
pub struct FilenameSanitizer {
    policy: FilenamePolicy,
    tokens: Arc<dyn TokenSource>,
}

impl fmt::Debug for FilenameSanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilenameSanitizer")
            .field("policy", &self.policy)
            .field("tokens", &"<source>")
            .finish()
    }
}

impl Default for FilenameSanitizer {
    fn default() -> Self {
        Self {
            policy: FilenamePolicy::default(),
            tokens: Arc::new(RandomTokens),
        }
    }
}

impl FilenameSanitizer {
    /// Creates a sanitizer with random tokens.
    ///
    /// Fails when `policy` does not pass [`FilenamePolicy::validate`].
    pub fn new(policy: FilenamePolicy) -> Result<Self, ConfigError> {
        Self::with_tokens(policy, RandomTokens)
    }

    /// Creates a sanitizer drawing tokens from `tokens`.
    pub fn with_tokens<T>(policy: FilenamePolicy, tokens: T) -> Result<Self, ConfigError>
    where
        T: TokenSource,
    {
        Self::from_shared(policy, Arc::new(tokens))
    }

    /// Creates a sanitizer sharing an existing token source.
    pub fn from_shared(
        policy: FilenamePolicy,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ConfigError> {
        policy.validate()?;
        Ok(Self { policy, tokens })
    }

    /// Returns a sanitizer applying `policy` with this sanitizer's token source.
    pub fn with_policy(&self, policy: FilenamePolicy) -> Result<Self, ConfigError> {
        Self::from_shared(policy, Arc::clone(&self.tokens))
    }

    pub(crate) fn tokens(&self) -> Arc<dyn TokenSource> {
        Arc::clone(&self.tokens)
    }

    /// Returns the active naming policy.
    pub fn policy(&self) -> &FilenamePolicy {
        &self.policy
    }

    /// Produces a fresh stored filename for `original`.
    pub fn sanitize(&self, original: Option<&str>) -> StoredFilename {
        let (base, extension) = self.split(original.unwrap_or_default());
        let timestamp = self.tokens.timestamp();
        let suffix = self.tokens.suffix();

        let name = match extension {
            Some(ext) => format!("{base}-{timestamp}-{suffix}.{ext}"),
            None => format!("{base}-{timestamp}-{suffix}"),
        };
        StoredFilename(name)
    }

    fn split(&self, original: &str) -> (String, Option<String>) {
        let trimmed = original.trim();
        let segment = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);

        let (raw_base, raw_ext) = match segment.rsplit_once('.') {
            Some((base, ext)) => (base, Some(ext)),
            None => (segment, None),
        };

        let extension = raw_ext
            .map(str::to_ascii_lowercase)
            .filter(|ext| self.policy.allows_extension(ext));

        let base = clean_base(raw_base, self.policy.max_base_len);
        if base.is_empty() {
            return (self.policy.placeholder.clone(), extension);
        }
        (base, extension)
    }
}

fn clean_base(raw: &str, max_len: usize) -> String {
    let kept: String = raw
        .chars()
        .map(|ch| if ch.is_whitespace() { ' ' } else { ch })
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '@' | ' '))
        .collect();

    let joined = kept.split_whitespace().collect::<Vec<_>>().join("-");
    joined
        .trim_start_matches('-')
        .chars()
        .take(max_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTokens;

    impl TokenSource for FixedTokens {
        fn timestamp(&self) -> u64 {
            1_700_000_000_000
        }

        fn suffix(&self) -> u64 {
            42
        }
    }

    fn fixed(original: Option<&str>) -> String {
        FilenameSanitizer::with_tokens(FilenamePolicy::default(), FixedTokens)
            .expect("default policy is valid")
            .sanitize(original)
            .into_string()
    }

    #[test]
    fn keeps_simple_names() {
        assert_eq!(fixed(Some("simple.jpg")), "simple-1700000000000-42.jpg");
        assert_eq!(fixed(Some("choc_bar@2x.png")), "choc_bar@2x-1700000000000-42.png");
    }

    #[test]
    fn collapses_whitespace_to_hyphens() {
        assert_eq!(
            fixed(Some("  gummy   bears  final.JPEG ")),
            "gummy-bears-final-1700000000000-42.jpeg"
        );
        assert_eq!(fixed(Some("tab\there.png")), "tab-here-1700000000000-42.png");
        assert_eq!(
            fixed(Some("line\r\n\tbreak.gif")),
            "line-break-1700000000000-42.gif"
        );
    }

    #[test]
    fn placeholder_for_missing_names() {
        assert_eq!(fixed(None), "file-1700000000000-42");
        assert_eq!(fixed(Some("")), "file-1700000000000-42");
        assert_eq!(fixed(Some("   ")), "file-1700000000000-42");
        assert_eq!(fixed(Some(".jpg")), "file-1700000000000-42.jpg");
        assert_eq!(fixed(Some("../..")), "file-1700000000000-42");
    }

    #[test]
    fn drops_unknown_extensions() {
        assert_eq!(fixed(Some("payload.exe")), "payload-1700000000000-42");
        assert_eq!(fixed(Some("shell.php.png")), "shellphp-1700000000000-42.png");
        assert_eq!(fixed(Some("trailing.")), "trailing-1700000000000-42");
    }

    #[test]
    fn keeps_only_last_path_segment() {
        assert_eq!(fixed(Some("../../../etc/passwd")), "passwd-1700000000000-42");
        assert_eq!(
            fixed(Some("C:\\Users\\me\\cake.gif")),
            "cake-1700000000000-42.gif"
        );
    }

    #[test]
    fn strips_nul_and_leading_hyphens() {
        assert_eq!(fixed(Some("nul\0byte.png")), "nulbyte-1700000000000-42.png");
        assert_eq!(fixed(Some("; rm -rf x.png")), "rm--rf-x-1700000000000-42.png");
        assert_eq!(fixed(Some("-flag.png")), "flag-1700000000000-42.png");
    }

    #[test]
    fn truncates_long_bases() {
        let long = format!("{}.png", "a".repeat(300));
        let name = fixed(Some(long.as_str()));
        assert_eq!(name, format!("{}-1700000000000-42.png", "a".repeat(100)));
    }

    #[test]
    fn sequential_tokens_never_repeat() {
        let sanitizer =
            FilenameSanitizer::with_tokens(FilenamePolicy::default(), SequentialTokens::starting_at(7))
                .expect("default policy is valid");
        let first = sanitizer.sanitize(Some("a.jpg"));
        let second = sanitizer.sanitize(Some("a.jpg"));
        assert!(first.as_str().ends_with("-7.jpg"));
        assert!(second.as_str().ends_with("-8.jpg"));
    }

    #[test]
    fn policy_validation() {
        assert!(FilenamePolicy::default().validate().is_ok());

        let policy = FilenamePolicy {
            placeholder: "../x".to_owned(),
            ..FilenamePolicy::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(ConfigError::InvalidPlaceholder { .. })
        ));

        let policy = FilenamePolicy {
            allowed_extensions: vec!["PNG".to_owned()],
            ..FilenamePolicy::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(ConfigError::InvalidExtension { .. })
        ));
    }

    #[test]
    fn constructors_reject_invalid_policies() {
        let policy = FilenamePolicy {
            placeholder: "../../escape".to_owned(),
            ..FilenamePolicy::default()
        };
        assert!(matches!(
            FilenameSanitizer::new(policy.clone()),
            Err(ConfigError::InvalidPlaceholder { .. })
        ));
        assert!(FilenameSanitizer::with_tokens(policy.clone(), FixedTokens).is_err());
        assert!(FilenameSanitizer::default().with_policy(policy).is_err());

        let policy = FilenamePolicy {
            allowed_extensions: vec!["png/..".to_owned()],
            ..FilenamePolicy::default()
        };
        assert!(FilenameSanitizer::new(policy).is_err());
    }

    #[test]
    fn with_policy_keeps_token_source() {
        let sanitizer = FilenameSanitizer::with_tokens(FilenamePolicy::default(), FixedTokens)
            .expect("default policy is valid");
        let sweet = sanitizer
            .with_policy(FilenamePolicy {
                placeholder: "sweet".to_owned(),
                ..FilenamePolicy::default()
            })
            .expect("policy is valid");
        assert_eq!(sweet.sanitize(None).as_str(), "sweet-1700000000000-42");
    }

    #[test]
    fn extension_accessor() {
        assert_eq!(
            StoredFilename(fixed(Some("x.PNG"))).extension(),
            Some("png")
        );
        assert_eq!(StoredFilename(fixed(Some("x"))).extension(), None);
    }
}
