//! Repository access layer.
//!
//! # Responsibility
//! - Define the session-scoped contract the article accessor consumes.
//! - Isolate SQLite query details from accessor orchestration.
//!
//! # Invariants
//! - Repository writes enforce `ArticleRecord::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `ItemExists`,
//!   `NotArticle`) in addition to DB transport errors.

pub mod content_repo;
pub mod session;
