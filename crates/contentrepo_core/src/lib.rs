//! Localized article content over a hierarchical content repository.
//!
//! Articles live at `<content path>/<language>`; reads fall back from the
//! requested language to the configured default and then to the first
//! available language.

pub mod config;
pub mod db;
pub mod locale;
pub mod logging;
pub mod model;
pub mod path;
pub mod repo;
pub mod service;

pub use config::{ConfigError, ContentConfig};
pub use locale::{available_locales, init_available_locales, LocaleSet};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::article::{ArticleRecord, ArticleValidationError};
pub use model::node::{ContentNode, ContentNodeId, ContentNodeType, ContentObject};
pub use path::ROOT_PATH;
pub use repo::content_repo::{RepoError, RepoResult, RepositoryAccess, SqliteRepositoryAccess};
pub use repo::session::{Identity, RepositoryLocation, SessionProvider, SqliteSessionProvider};
pub use service::article_accessor::{
    AccessorError, AccessorResult, ArticleContentAccessor, ItemCheck, LanguageResolution,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
