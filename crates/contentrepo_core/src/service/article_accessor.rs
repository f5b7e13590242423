//! Localized article accessor.
//!
//! # Responsibility
//! - Map a content path plus language to a concrete article node, falling
//!   back to the configured default language or the first available one.
//! - Read, write, update and remove articles through one repository session.
//! - Keep the most recently loaded article as the current record.
//!
//! # Invariants
//! - The accessor exclusively owns its session; `close` consumes it.
//! - Write paths always end with exactly one effective-language segment.
//! - Failed reads leave the current record untouched.
//! - Repository failures during language resolution never abort the
//!   resolution; they fall through to the next tier.

use crate::config::ContentConfig;
use crate::locale::{available_locales, LocaleSet};
use crate::model::article::{ArticleRecord, ArticleValidationError};
use crate::model::node::{ContentNodeType, ContentObject};
use crate::path::{self, ROOT_PATH};
use crate::repo::content_repo::{RepoError, RepositoryAccess};
use crate::repo::session::{Identity, SessionProvider};
use log::{debug, error, info, warn};
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AccessorResult<T> = Result<T, AccessorError>;

/// Errors surfaced by [`ArticleContentAccessor`].
#[derive(Debug)]
pub enum AccessorError {
    /// No node exists at the resolved path.
    NotFound(String),
    /// Node exists but has no such version.
    VersionNotFound { path: String, version: String },
    /// Node exists but is not an article.
    TypeMismatch {
        path: String,
        node_type: ContentNodeType,
    },
    /// An item already exists at the store target.
    Conflict(String),
    /// Session identity was rejected.
    Authentication(String),
    /// Record failed validation before reaching storage.
    Validation(ArticleValidationError),
    /// Any other repository failure.
    Persistence(RepoError),
}

impl Display for AccessorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "no content node at {path}"),
            Self::VersionNotFound { path, version } => {
                write!(f, "content node {path} has no version `{version}`")
            }
            Self::TypeMismatch { path, node_type } => write!(
                f,
                "content object at {path} is a {node_type}, only article content objects are supported"
            ),
            Self::Conflict(path) => write!(f, "content already exists at {path}"),
            Self::Authentication(message) => write!(f, "authentication failed: {message}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "repository failure: {err}"),
        }
    }
}

impl Error for AccessorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AccessorError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(path) => Self::NotFound(path),
            RepoError::VersionNotFound { path, version } => Self::VersionNotFound { path, version },
            RepoError::ItemExists(path) => Self::Conflict(path),
            RepoError::NotArticle { path, node_type } => Self::TypeMismatch { path, node_type },
            RepoError::Authentication(message) => Self::Authentication(message),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Persistence(other),
        }
    }
}

/// Outcome of one existence check during language resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCheck {
    Present,
    Absent,
    /// The repository could not answer; treated like `Absent`.
    CheckFailed,
}

/// Which fallback tier produced a resolved language path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageResolution {
    /// The root path, returned as is.
    Root,
    /// `<base>/<requested language>` exists.
    Requested(String),
    /// `<base>/<fallback language>` exists.
    Fallback(String),
    /// First locale-named child of the base.
    FirstAvailable(String),
    /// Nothing matched; the input path is handed on to the fetch.
    Unresolved(String),
}

impl LanguageResolution {
    pub fn path(&self) -> &str {
        match self {
            Self::Root => ROOT_PATH,
            Self::Requested(path)
            | Self::Fallback(path)
            | Self::FirstAvailable(path)
            | Self::Unresolved(path) => path,
        }
    }

    pub fn into_path(self) -> String {
        match self {
            Self::Root => ROOT_PATH.to_string(),
            Self::Requested(path)
            | Self::Fallback(path)
            | Self::FirstAvailable(path)
            | Self::Unresolved(path) => path,
        }
    }

    fn tier(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Requested(_) => "requested",
            Self::Fallback(_) => "fallback",
            Self::FirstAvailable(_) => "first_available",
            Self::Unresolved(_) => "unresolved",
        }
    }
}

/// Article-level facade over one repository session.
pub struct ArticleContentAccessor<A: RepositoryAccess> {
    access: A,
    locales: Cow<'static, LocaleSet>,
    fallback_language: String,
    current: Option<ArticleRecord>,
}

impl<A: RepositoryAccess> ArticleContentAccessor<A> {
    /// Opens a session for `identity` and wraps it.
    ///
    /// # Errors
    /// - `Authentication` when the provider rejects the identity.
    /// - `Persistence` when the repository cannot be opened.
    pub fn open<P>(provider: &P, identity: &Identity, config: &ContentConfig) -> AccessorResult<Self>
    where
        P: SessionProvider<Session = A>,
    {
        let access = provider.open_session(identity)?;
        Ok(Self::new(access, config))
    }

    /// Wraps an already opened session.
    ///
    /// Locale lookups use `locales.available` from `config` when set, and
    /// the process-wide locale set otherwise.
    pub fn new(access: A, config: &ContentConfig) -> Self {
        let locales = match config.available_locales() {
            Some(configured) => Cow::Owned(configured.clone()),
            None => Cow::Borrowed(available_locales()),
        };
        Self {
            access,
            locales,
            fallback_language: config.fallback_locale().to_string(),
            current: None,
        }
    }

    /// Commits pending changes and releases the session.
    pub fn close(self) -> AccessorResult<()> {
        self.access.close().map_err(AccessorError::Persistence)
    }

    /// Most recently loaded or written article.
    pub fn current(&self) -> Option<&ArticleRecord> {
        self.current.as_ref()
    }

    /// Language substituted when a write supplies none.
    pub fn fallback_language(&self) -> &str {
        &self.fallback_language
    }

    /// Reads the article stored exactly at `path`.
    ///
    /// The returned record carries the node's base version.
    pub fn read(&mut self, path: &str) -> AccessorResult<ArticleRecord> {
        let path = path::canonicalize(path);
        let object = self.access.get_content_object(&path)?;
        let article = expect_article(object, &path)?;
        let version = self.access.base_version(&path)?;

        let article = article.with_version(version);
        debug!(
            "event=article_read module=accessor status=ok path={} version={}",
            article.path,
            article.version.as_deref().unwrap_or("none")
        );
        self.current = Some(article.clone());
        Ok(article)
    }

    /// Reads `path` in `language`, falling back as described on
    /// [`Self::resolve_language`].
    pub fn read_in_language(&mut self, path: &str, language: &str) -> AccessorResult<ArticleRecord> {
        let resolved = self.resolve_language_path(path, language);
        self.read(&resolved)
    }

    /// Reads one historical version of `path` in `language`.
    ///
    /// The record's version is `version` as requested.
    pub fn read_version(
        &mut self,
        path: &str,
        language: &str,
        version: &str,
    ) -> AccessorResult<ArticleRecord> {
        let resolved = path::canonicalize(&self.resolve_language_path(path, language));
        let object = self.access.get_content_object_version(&resolved, version)?;
        let article = expect_article(object, &resolved)?.with_version(Some(version.to_string()));

        debug!(
            "event=article_read module=accessor status=ok path={} version={}",
            article.path, version
        );
        self.current = Some(article.clone());
        Ok(article)
    }

    /// Stores a new article under `path/<language>`.
    ///
    /// An empty `language` means the fallback language.
    ///
    /// # Errors
    /// - `Conflict` when an item already exists at the final path.
    /// - `Validation` for illegal path segments.
    pub fn write(
        &mut self,
        path: &str,
        language: &str,
        title: &str,
        body: &str,
        publish_date: i64,
    ) -> AccessorResult<ArticleRecord> {
        let article = self.build_record(path, language, title, body, publish_date);
        let version = self.access.store_content_object(&article).map_err(|err| {
            warn!(
                "event=article_write module=accessor status=error path={} error={}",
                article.path, err
            );
            AccessorError::from(err)
        })?;

        let article = article.with_version(Some(version));
        info!(
            "event=article_write module=accessor status=ok path={} language={}",
            article.path, article.language
        );
        self.current = Some(article.clone());
        Ok(article)
    }

    /// Checks in a new version of an existing article.
    ///
    /// Path and language are normalized exactly as in [`Self::write`].
    pub fn update(
        &mut self,
        path: &str,
        language: &str,
        title: &str,
        body: &str,
        publish_date: i64,
    ) -> AccessorResult<ArticleRecord> {
        let article = self.build_record(path, language, title, body, publish_date);
        let version = self.access.update_content_object(&article)?;

        let article = article.with_version(Some(version));
        info!(
            "event=article_update module=accessor status=ok path={} version={}",
            article.path,
            article.version.as_deref().unwrap_or("none")
        );
        self.current = Some(article.clone());
        Ok(article)
    }

    /// Removes the node at `path` together with its subtree.
    pub fn remove(&mut self, path: &str) -> AccessorResult<()> {
        let path = path::canonicalize(path);
        self.access.remove_content_object(&path)?;

        let removed_current = self.current.as_ref().is_some_and(|current| {
            current.path == path || current.path.starts_with(&format!("{path}/"))
        });
        if removed_current {
            self.current = None;
        }
        info!("event=article_remove module=accessor status=ok path={path}");
        Ok(())
    }

    /// Version names of the current article, oldest first.
    ///
    /// Returns an empty list when no article has been loaded.
    pub fn list_versions(&self) -> AccessorResult<Vec<String>> {
        match &self.current {
            Some(article) => Ok(self.access.version_list(&article.path)?),
            None => {
                warn!(
                    "event=version_list module=accessor status=skipped reason=no_article_loaded"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Locale-named children of the language base of `path`.
    pub fn available_languages(&self, path: &str) -> AccessorResult<Vec<String>> {
        let base = path::language_base(path, &self.locales);
        let children = self.access.child_nodes(path::base_node_path(&base))?;
        Ok(children
            .into_iter()
            .map(|child| child.name)
            .filter(|name| self.locales.contains(name))
            .collect())
    }

    /// Resolves `path` and `language` to the path that should be read.
    pub fn resolve_language_path(&self, path: &str, language: &str) -> String {
        self.resolve_language(path, language).into_path()
    }

    /// Resolves `path` and `language`, reporting the tier that matched.
    ///
    /// Tiers, in order: the root as is, `<base>/<language>`,
    /// `<base>/<fallback>`, the first locale-named child of `<base>`. When
    /// none applies the input path is returned as `Unresolved` and the
    /// following read reports the failure.
    pub fn resolve_language(&self, path: &str, language: &str) -> LanguageResolution {
        if path == ROOT_PATH {
            return LanguageResolution::Root;
        }

        let base = path::language_base(path, &self.locales);
        let resolution = self
            .existing_variant(&base, language)
            .map(LanguageResolution::Requested)
            .or_else(|| {
                self.existing_variant(&base, &self.fallback_language)
                    .map(LanguageResolution::Fallback)
            })
            .or_else(|| {
                self.first_available_variant(&base)
                    .map(LanguageResolution::FirstAvailable)
            })
            .unwrap_or_else(|| LanguageResolution::Unresolved(path.to_string()));

        match &resolution {
            LanguageResolution::Unresolved(path) => warn!(
                "event=language_resolve module=accessor status=unresolved path={} language={}",
                path, language
            ),
            other => debug!(
                "event=language_resolve module=accessor status=ok tier={} path={}",
                other.tier(),
                other.path()
            ),
        }
        resolution
    }

    /// Tri-state existence check; failures are logged, never raised.
    pub fn check_item(&self, path: &str) -> ItemCheck {
        match self.access.item_exists(path) {
            Ok(true) => ItemCheck::Present,
            Ok(false) => ItemCheck::Absent,
            Err(err) => {
                error!(
                    "event=item_check module=accessor status=error path={} error={}",
                    path, err
                );
                ItemCheck::CheckFailed
            }
        }
    }

    fn existing_variant(&self, base: &str, language: &str) -> Option<String> {
        if language.is_empty() {
            return None;
        }
        let candidate = format!("{base}{language}");
        match self.check_item(&candidate) {
            ItemCheck::Present => Some(candidate),
            ItemCheck::Absent | ItemCheck::CheckFailed => None,
        }
    }

    fn first_available_variant(&self, base: &str) -> Option<String> {
        match self.access.child_nodes(path::base_node_path(base)) {
            Ok(children) => children
                .into_iter()
                .find(|child| self.locales.contains(&child.name))
                .map(|child| child.path),
            Err(RepoError::NotFound(_)) => None,
            Err(err) => {
                error!(
                    "event=child_scan module=accessor status=error path={} error={}",
                    base, err
                );
                None
            }
        }
    }

    fn build_record(
        &self,
        path: &str,
        language: &str,
        title: &str,
        body: &str,
        publish_date: i64,
    ) -> ArticleRecord {
        let language = match language.trim() {
            "" => self.fallback_language.as_str(),
            trimmed => trimmed,
        };
        ArticleRecord::new(
            path::with_language_segment(path, language),
            language,
            title,
            body,
            publish_date,
        )
    }
}

fn expect_article(object: ContentObject, path: &str) -> AccessorResult<ArticleRecord> {
    match object {
        ContentObject::Article(article) => Ok(article),
        ContentObject::Node(node) => {
            warn!(
                "event=article_read module=accessor status=error path={} error_code=type_mismatch node_type={}",
                path, node.node_type
            );
            Err(AccessorError::TypeMismatch {
                path: path.to_string(),
                node_type: node.node_type,
            })
        }
    }
}
