//! Content path helpers.
//!
//! # Responsibility
//! - Canonicalize filesystem-like content paths.
//! - Derive the language base of a localized path and language-qualified
//!   write paths.
//!
//! # Invariants
//! - Canonical paths start with `/`, have no empty segments and no trailing
//!   separator; the root is exactly `/`.
//! - Language bases always end with exactly one `/`.

use crate::locale::LocaleSet;

/// Path of the repository root node.
pub const ROOT_PATH: &str = "/";

/// Segment separator for content paths.
pub const SEPARATOR: char = '/';

/// Iterates the non-empty segments of `path`.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

/// Rebuilds `path` with one leading separator and single separators between
/// segments.
pub fn canonicalize(path: &str) -> String {
    let mut canonical = String::with_capacity(path.len() + 1);
    for segment in segments(path) {
        canonical.push(SEPARATOR);
        canonical.push_str(segment);
    }
    if canonical.is_empty() {
        canonical.push(SEPARATOR);
    }
    canonical
}

/// Returns the canonical path with a trailing locale segment stripped,
/// terminated by a separator.
///
/// `/articles/intro/fr` and `/articles//intro/` both yield `/articles/intro/`.
pub fn language_base(path: &str, locales: &LocaleSet) -> String {
    let mut parts: Vec<&str> = segments(path).collect();
    if parts.last().is_some_and(|last| locales.contains(last)) {
        parts.pop();
    }

    let mut base = String::from(ROOT_PATH);
    for part in parts {
        base.push_str(part);
        base.push(SEPARATOR);
    }
    base
}

/// Turns a language base back into a node path (`/a/b/` -> `/a/b`).
pub fn base_node_path(base: &str) -> &str {
    let trimmed = base.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        ROOT_PATH
    } else {
        trimmed
    }
}

/// Canonicalizes `path` and makes `language` its last segment.
///
/// The language is appended unless it already is the final segment, so
/// `/articles/intro/` + `en` gives `/articles/intro/en` and
/// `/articles/intro/en` stays as is.
pub fn with_language_segment(path: &str, language: &str) -> String {
    let canonical = canonicalize(path);
    if last_segment(&canonical) == Some(language) {
        return canonical;
    }
    join(&canonical, language)
}

/// Joins a canonical parent path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        format!("{ROOT_PATH}{name}")
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Returns the parent of a canonical path; the root has none.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT_PATH {
        return None;
    }
    match path.rfind(SEPARATOR) {
        Some(0) => Some(ROOT_PATH),
        Some(index) => Some(&path[..index]),
        None => None,
    }
}

/// Returns the final segment of `path`, if any.
pub fn last_segment(path: &str) -> Option<&str> {
    segments(path).last()
}

/// Returns every proper ancestor of a canonical path, root first.
///
/// `/a/b/c` yields `/`, `/a`, `/a/b`.
pub fn ancestors(path: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut cursor = parent(path);
    while let Some(current) = cursor {
        result.push(current.to_string());
        cursor = parent(current);
    }
    result.reverse();
    result
}
