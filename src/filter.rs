//! Declared content-type filtering.
//!
//! Only the client-declared MIME type is inspected. Nothing here reads file
//! bytes, so a forged `image/*` header passes; content sniffing belongs to a
//! later stage.

use crate::{error::UploadError, storage::FileMeta};

const IMAGE_PREFIX: &str = "image/";

/// Returns `true` when `declared_mime_type` starts with `image/`.
pub fn accept(declared_mime_type: &str) -> bool {
    declared_mime_type.starts_with(IMAGE_PREFIX)
}

/// Content-type policy applied before any byte is persisted.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MimeFilter {
    /// Accept any declared type beginning with `image/`.
    #[default]
    ImagesOnly,
    /// Accept only types matching one of the patterns (`image/png`, `image/*`).
    Patterns(Vec<String>),
    /// Accept every declared type.
    Any,
}

impl MimeFilter {
    /// Creates an allow-list filter from MIME patterns.
    pub fn patterns<I, T>(patterns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::Patterns(patterns.into_iter().map(Into::into).collect())
    }

    /// Returns `true` when the declared type passes this filter.
    pub fn allows(&self, declared_mime_type: &str) -> bool {
        match self {
            Self::ImagesOnly => accept(declared_mime_type),
            Self::Patterns(patterns) => patterns
                .iter()
                .any(|pattern| mime_matches_pattern(declared_mime_type, pattern)),
            Self::Any => true,
        }
    }

    /// Checks a file descriptor, returning the rejection error when refused.
    pub fn check(&self, meta: &FileMeta) -> Result<(), UploadError> {
        if self.allows(&meta.declared_mime_type) {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(
            field_name = meta.field_name.as_str(),
            original_name = meta.original_name.as_deref().unwrap_or("<none>"),
            mime = meta.declared_mime_type.as_str(),
            "upload filter rejected declared content type"
        );

        let field = meta.field_name.clone();
        let mime = meta.declared_mime_type.clone();
        Err(match self {
            Self::Patterns(_) => UploadError::MimeTypeNotAllowed { field, mime },
            _ => UploadError::OnlyImagesAllowed { field, mime },
        })
    }
}

/// Returns `true` when `pattern` has the `type/subtype` shape and parses.
pub(crate) fn is_valid_pattern(pattern: &str) -> bool {
    match pattern.split_once('/') {
        Some((kind, "*")) => !kind.is_empty() && !kind.contains('*'),
        Some(_) => pattern.parse::<mime::Mime>().is_ok(),
        None => false,
    }
}

fn mime_matches_pattern(declared: &str, pattern: &str) -> bool {
    let Ok(parsed) = declared.parse::<mime::Mime>() else {
        return false;
    };

    if let Some((kind, "*")) = pattern.split_once('/') {
        return parsed.type_().as_str().eq_ignore_ascii_case(kind);
    }

    parsed.essence_str().eq_ignore_ascii_case(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_check_is_exact() {
        assert!(accept("image/png"));
        assert!(accept("image/x-icon"));
        assert!(!accept("image"));
        assert!(!accept("IMAGE/PNG"));
        assert!(!accept(" image/png"));
        assert!(!accept("application/image/png"));
    }

    #[test]
    fn patterns_match_wildcards_and_essence() {
        let filter = MimeFilter::patterns(["image/png", "text/*"]);
        assert!(filter.allows("image/png"));
        assert!(filter.allows("image/PNG; charset=binary"));
        assert!(filter.allows("text/csv"));
        assert!(!filter.allows("image/jpeg"));
        assert!(!filter.allows("not a mime"));
    }

    #[test]
    fn pattern_validation() {
        assert!(is_valid_pattern("image/*"));
        assert!(is_valid_pattern("image/svg+xml"));
        assert!(!is_valid_pattern("image"));
        assert!(!is_valid_pattern("*/*"));
        assert!(!is_valid_pattern("/png"));
    }
}
