//! Article domain model.
//!
//! # Responsibility
//! - Define the typed article record mapped onto `article` content nodes.
//! - Validate records before they reach the repository.
//!
//! # Invariants
//! - `path` is canonical, absolute and not the root.
//! - The last segment of `path` equals `language`.
//! - `version` is `None` until the record is stamped by a read or store.

use crate::path::{self, ROOT_PATH};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static ILLEGAL_NAME_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[\]\*\|:\p{Cc}]").expect("valid node name regex"));

/// Validation failures for [`ArticleRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleValidationError {
    /// Path does not start with `/` or contains empty segments.
    NonCanonicalPath(String),
    /// Articles cannot live at the repository root.
    RootPath,
    /// One path segment is not a legal node name.
    IllegalSegment { path: String, segment: String },
    /// Language is blank after trim.
    EmptyLanguage,
    /// Last path segment differs from the record language.
    LanguageSegmentMismatch { path: String, language: String },
}

impl Display for ArticleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonCanonicalPath(path) => write!(f, "content path is not canonical: `{path}`"),
            Self::RootPath => write!(f, "an article cannot be stored at the repository root"),
            Self::IllegalSegment { path, segment } => {
                write!(f, "illegal node name `{segment}` in content path `{path}`")
            }
            Self::EmptyLanguage => write!(f, "article language must not be blank"),
            Self::LanguageSegmentMismatch { path, language } => write!(
                f,
                "content path `{path}` must end with language segment `{language}`"
            ),
        }
    }
}

impl Error for ArticleValidationError {}

/// Localized article stored at `<base>/<language>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Canonical content path, ending with the language segment.
    pub path: String,
    /// Locale identifier, e.g. `en` or `fr_FR`.
    pub language: String,
    pub title: String,
    pub body: String,
    /// Unix epoch milliseconds.
    pub publish_date: i64,
    /// Repository version name (`1.0`, `1.1`, ...).
    pub version: Option<String>,
}

impl ArticleRecord {
    /// Creates an unversioned record.
    pub fn new(
        path: impl Into<String>,
        language: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        publish_date: i64,
    ) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            title: title.into(),
            body: body.into(),
            publish_date,
            version: None,
        }
    }

    /// Returns this record stamped with `version`.
    pub fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// Checks path shape and language invariants.
    pub fn validate(&self) -> Result<(), ArticleValidationError> {
        if self.language.trim().is_empty() {
            return Err(ArticleValidationError::EmptyLanguage);
        }
        if self.path == ROOT_PATH {
            return Err(ArticleValidationError::RootPath);
        }
        if path::canonicalize(&self.path) != self.path {
            return Err(ArticleValidationError::NonCanonicalPath(self.path.clone()));
        }

        for segment in path::segments(&self.path) {
            if !is_legal_node_name(segment) {
                return Err(ArticleValidationError::IllegalSegment {
                    path: self.path.clone(),
                    segment: segment.to_string(),
                });
            }
        }

        if path::last_segment(&self.path) != Some(self.language.as_str()) {
            return Err(ArticleValidationError::LanguageSegmentMismatch {
                path: self.path.clone(),
                language: self.language.clone(),
            });
        }
        Ok(())
    }
}

/// Returns whether `name` may be used as a node name.
pub fn is_legal_node_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !ILLEGAL_NAME_CHARS_RE.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::{is_legal_node_name, ArticleRecord, ArticleValidationError};

    fn record(path: &str, language: &str) -> ArticleRecord {
        ArticleRecord::new(path, language, "Title", "Body", 0)
    }

    #[test]
    fn valid_record_passes() {
        assert!(record("/articles/intro/en", "en").validate().is_ok());
    }

    #[test]
    fn language_must_match_last_segment() {
        let err = record("/articles/intro/en", "fr").validate().unwrap_err();
        assert!(matches!(
            err,
            ArticleValidationError::LanguageSegmentMismatch { .. }
        ));
    }

    #[test]
    fn non_canonical_and_root_paths_are_rejected() {
        assert_eq!(
            record("/articles//en", "en").validate().unwrap_err(),
            ArticleValidationError::NonCanonicalPath("/articles//en".to_string())
        );
        assert_eq!(
            record("/", "en").validate().unwrap_err(),
            ArticleValidationError::RootPath
        );
        assert_eq!(
            record("/articles/intro/en", " ").validate().unwrap_err(),
            ArticleValidationError::EmptyLanguage
        );
    }

    #[test]
    fn illegal_segments_are_rejected() {
        let err = record("/articles/a:b/en", "en").validate().unwrap_err();
        assert!(matches!(
            err,
            ArticleValidationError::IllegalSegment { segment, .. } if segment == "a:b"
        ));
        assert!(!is_legal_node_name(".."));
        assert!(!is_legal_node_name("tab\there"));
        assert!(is_legal_node_name("intro-2024"));
    }

    #[test]
    fn record_serializes_with_version() {
        let value = serde_json::to_value(
            record("/articles/intro/en", "en").with_version(Some("1.0".to_string())),
        )
        .unwrap();
        assert_eq!(value["path"], "/articles/intro/en");
        assert_eq!(value["version"], "1.0");
    }
}
