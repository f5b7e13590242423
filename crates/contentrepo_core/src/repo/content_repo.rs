//! Repository access contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the node-level operations the article accessor consumes.
//! - Keep SQL details of the content tree and version history inside the
//!   persistence boundary.
//!
//! # Invariants
//! - One `SqliteRepositoryAccess` is one session: it owns its connection and
//!   one open transaction, committed only by `close`.
//! - Write paths call `ArticleRecord::validate()` before SQL mutations.
//! - Missing ancestors of a stored article are created as folders.
//! - Version names are `1.<seq>` in check-in order; `base_version` always
//!   names the newest one.
//! - Child listing is deterministic: `sort_order ASC, name ASC`.

use crate::db::{ensure_schema_ready, DbError};
use crate::model::article::{ArticleRecord, ArticleValidationError};
use crate::model::node::{ContentNode, ContentNodeId, ContentNodeType, ContentObject};
use crate::path::{self, ROOT_PATH};
use crate::repo::session::Identity;
use log::{error, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const NODE_SELECT_SQL: &str = "SELECT
    node_uuid,
    path,
    parent_path,
    name,
    node_type,
    sort_order,
    base_version,
    created_at,
    updated_at
FROM content_nodes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from repository access operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Session identity was rejected.
    Authentication(String),
    /// No node exists at the path.
    NotFound(String),
    /// Node exists but has no version with this name.
    VersionNotFound { path: String, version: String },
    /// Store target is already occupied.
    ItemExists(String),
    /// Article operation addressed a node of another type.
    NotArticle {
        path: String,
        node_type: ContentNodeType,
    },
    RootNotRemovable,
    Validation(ArticleValidationError),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Authentication(message) => write!(f, "authentication failed: {message}"),
            Self::NotFound(path) => write!(f, "content node not found: {path}"),
            Self::VersionNotFound { path, version } => {
                write!(f, "version `{version}` not found for content node {path}")
            }
            Self::ItemExists(path) => write!(f, "content node already exists: {path}"),
            Self::NotArticle { path, node_type } => {
                write!(f, "content node {path} is a {node_type}, not an article")
            }
            Self::RootNotRemovable => write!(f, "the repository root cannot be removed"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted content data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ArticleValidationError> for RepoError {
    fn from(value: ArticleValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Node-level repository operations for one session.
pub trait RepositoryAccess {
    /// Returns whether any node exists at `path`.
    fn item_exists(&self, path: &str) -> RepoResult<bool>;
    /// Lists direct children of an existing node in sibling order.
    fn child_nodes(&self, path: &str) -> RepoResult<Vec<ContentNode>>;
    /// Fetches the current state of the node at `path`.
    fn get_content_object(&self, path: &str) -> RepoResult<ContentObject>;
    /// Fetches one historical version of the node at `path`.
    fn get_content_object_version(&self, path: &str, version: &str) -> RepoResult<ContentObject>;
    /// Returns the newest version name; `None` for unversioned nodes.
    fn base_version(&self, path: &str) -> RepoResult<Option<String>>;
    /// Creates a new article node and returns its first version name.
    fn store_content_object(&mut self, article: &ArticleRecord) -> RepoResult<String>;
    /// Checks in a new version of an existing article and returns its name.
    fn update_content_object(&mut self, article: &ArticleRecord) -> RepoResult<String>;
    /// Removes the node at `path` with its subtree and version history.
    fn remove_content_object(&mut self, path: &str) -> RepoResult<()>;
    /// Lists version names of the node at `path`, oldest first.
    fn version_list(&self, path: &str) -> RepoResult<Vec<String>>;
    /// Commits pending changes and ends the session.
    fn close(self) -> RepoResult<()>
    where
        Self: Sized;
}

/// SQLite-backed repository session.
pub struct SqliteRepositoryAccess {
    conn: Connection,
    identity: Identity,
}

impl SqliteRepositoryAccess {
    /// Starts a session on a migrated connection.
    ///
    /// # Errors
    /// - `Authentication` when `identity` is malformed.
    /// - `Db` when the connection is not migrated or the transaction cannot
    ///   begin.
    pub fn login(conn: Connection, identity: &Identity) -> RepoResult<Self> {
        if let Err(message) = identity.validate() {
            warn!(
                "event=session_open module=repo status=error error_code=authentication_failed error={}",
                message
            );
            return Err(RepoError::Authentication(message));
        }
        ensure_schema_ready(&conn)?;
        // foreign_keys cannot be toggled inside a transaction.
        conn.execute_batch("PRAGMA foreign_keys = ON; BEGIN DEFERRED;")?;

        info!(
            "event=session_open module=repo status=ok user={}",
            identity.user_login_id()
        );
        Ok(Self {
            conn,
            identity: identity.clone(),
        })
    }

    /// Identity this session is scoped to.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl RepositoryAccess for SqliteRepositoryAccess {
    fn item_exists(&self, path: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM content_nodes WHERE path = ?1);",
            [path],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn child_nodes(&self, path: &str) -> RepoResult<Vec<ContentNode>> {
        require_node(&self.conn, path)?;

        let mut stmt = self.conn.prepare(&format!(
            "{NODE_SELECT_SQL}
             WHERE parent_path = ?1
             ORDER BY sort_order ASC, name ASC;"
        ))?;
        let mut rows = stmt.query([path])?;
        let mut children = Vec::new();
        while let Some(row) = rows.next()? {
            children.push(parse_node_row(row)?);
        }
        Ok(children)
    }

    fn get_content_object(&self, path: &str) -> RepoResult<ContentObject> {
        let node = require_node(&self.conn, path)?;
        match node.node_type {
            ContentNodeType::Folder => Ok(ContentObject::Node(node)),
            ContentNodeType::Article => {
                let version = node.base_version.clone().ok_or_else(|| {
                    RepoError::InvalidData(format!("article {path} has no base version"))
                })?;
                let article = load_article_version(&self.conn, &node, &version)?.ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "article {path} has no row for base version `{version}`"
                    ))
                })?;
                Ok(ContentObject::Article(article))
            }
        }
    }

    fn get_content_object_version(&self, path: &str, version: &str) -> RepoResult<ContentObject> {
        let node = require_node(&self.conn, path)?;
        if node.node_type != ContentNodeType::Article {
            return Ok(ContentObject::Node(node));
        }

        load_article_version(&self.conn, &node, version)?
            .map(ContentObject::Article)
            .ok_or_else(|| RepoError::VersionNotFound {
                path: path.to_string(),
                version: version.to_string(),
            })
    }

    fn base_version(&self, path: &str) -> RepoResult<Option<String>> {
        Ok(require_node(&self.conn, path)?.base_version)
    }

    fn store_content_object(&mut self, article: &ArticleRecord) -> RepoResult<String> {
        article.validate()?;

        let sp = self.conn.savepoint()?;
        if load_node(&sp, &article.path)?.is_some() {
            return Err(RepoError::ItemExists(article.path.clone()));
        }

        for ancestor in path::ancestors(&article.path) {
            if load_node(&sp, &ancestor)?.is_none() {
                insert_node(&sp, &ancestor, ContentNodeType::Folder, None)?;
            }
        }

        let version = version_name(0);
        let node_uuid = insert_node(&sp, &article.path, ContentNodeType::Article, Some(&version))?;
        insert_version(&sp, node_uuid, 0, &version, article, &self.identity)?;
        sp.commit()?;

        info!(
            "event=content_store module=repo status=ok path={} version={}",
            article.path, version
        );
        Ok(version)
    }

    fn update_content_object(&mut self, article: &ArticleRecord) -> RepoResult<String> {
        article.validate()?;

        let sp = self.conn.savepoint()?;
        let node = require_node(&sp, &article.path)?;
        if node.node_type != ContentNodeType::Article {
            return Err(RepoError::NotArticle {
                path: article.path.clone(),
                node_type: node.node_type,
            });
        }

        let seq: i64 = sp.query_row(
            "SELECT COALESCE(MAX(seq), -1) + 1
             FROM article_versions
             WHERE node_uuid = ?1;",
            [node.node_uuid.to_string()],
            |row| row.get(0),
        )?;
        let version = version_name(seq);
        insert_version(&sp, node.node_uuid, seq, &version, article, &self.identity)?;
        sp.execute(
            "UPDATE content_nodes
             SET base_version = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE node_uuid = ?1;",
            params![node.node_uuid.to_string(), version],
        )?;
        sp.commit()?;

        info!(
            "event=content_update module=repo status=ok path={} version={}",
            article.path, version
        );
        Ok(version)
    }

    fn remove_content_object(&mut self, path: &str) -> RepoResult<()> {
        if path == ROOT_PATH {
            return Err(RepoError::RootNotRemovable);
        }

        // Children and version rows go through ON DELETE CASCADE.
        let changed = self
            .conn
            .execute("DELETE FROM content_nodes WHERE path = ?1;", [path])?;
        if changed == 0 {
            return Err(RepoError::NotFound(path.to_string()));
        }

        info!("event=content_remove module=repo status=ok path={path}");
        Ok(())
    }

    fn version_list(&self, path: &str) -> RepoResult<Vec<String>> {
        let node = require_node(&self.conn, path)?;

        let mut stmt = self.conn.prepare(
            "SELECT version_name
             FROM article_versions
             WHERE node_uuid = ?1
             ORDER BY seq ASC;",
        )?;
        let mut rows = stmt.query([node.node_uuid.to_string()])?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next()? {
            versions.push(row.get(0)?);
        }
        Ok(versions)
    }

    fn close(self) -> RepoResult<()> {
        let Self { conn, identity } = self;

        if let Err(err) = conn.execute_batch("COMMIT;") {
            error!(
                "event=session_close module=repo status=error user={} error_code=commit_failed error={}",
                identity.user_login_id(),
                err
            );
            return Err(err.into());
        }
        conn.close().map_err(|(_, err)| RepoError::from(err))?;

        info!(
            "event=session_close module=repo status=ok user={}",
            identity.user_login_id()
        );
        Ok(())
    }
}

fn version_name(seq: i64) -> String {
    format!("1.{seq}")
}

fn load_node(conn: &Connection, path: &str) -> RepoResult<Option<ContentNode>> {
    let mut stmt = conn.prepare(&format!("{NODE_SELECT_SQL} WHERE path = ?1;"))?;
    let mut rows = stmt.query([path])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_node_row(row)?));
    }
    Ok(None)
}

fn require_node(conn: &Connection, path: &str) -> RepoResult<ContentNode> {
    load_node(conn, path)?.ok_or_else(|| RepoError::NotFound(path.to_string()))
}

fn load_article_version(
    conn: &Connection,
    node: &ContentNode,
    version: &str,
) -> RepoResult<Option<ArticleRecord>> {
    let record = conn
        .query_row(
            "SELECT language, title, body, publish_date
             FROM article_versions
             WHERE node_uuid = ?1
               AND version_name = ?2;",
            params![node.node_uuid.to_string(), version],
            |row| {
                Ok(ArticleRecord::new(
                    node.path.as_str(),
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get(3)?,
                ))
            },
        )
        .optional()?;
    Ok(record)
}

fn insert_node(
    conn: &Connection,
    node_path: &str,
    node_type: ContentNodeType,
    base_version: Option<&str>,
) -> RepoResult<ContentNodeId> {
    let parent_path = path::parent(node_path)
        .ok_or_else(|| RepoError::InvalidData(format!("node {node_path} has no parent")))?;
    let name = path::last_segment(node_path).unwrap_or_default();
    let sort_order: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1
         FROM content_nodes
         WHERE parent_path = ?1;",
        [parent_path],
        |row| row.get(0),
    )?;

    let node_uuid = Uuid::new_v4();
    conn.execute(
        "INSERT INTO content_nodes (
            node_uuid,
            path,
            parent_path,
            name,
            node_type,
            sort_order,
            base_version
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            node_uuid.to_string(),
            node_path,
            parent_path,
            name,
            node_type.as_str(),
            sort_order,
            base_version,
        ],
    )?;
    Ok(node_uuid)
}

fn insert_version(
    conn: &Connection,
    node_uuid: ContentNodeId,
    seq: i64,
    version: &str,
    article: &ArticleRecord,
    identity: &Identity,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO article_versions (
            node_uuid,
            seq,
            version_name,
            language,
            title,
            body,
            publish_date,
            created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
        params![
            node_uuid.to_string(),
            seq,
            version,
            article.language.as_str(),
            article.title.as_str(),
            article.body.as_str(),
            article.publish_date,
            identity.user_login_id(),
        ],
    )?;
    Ok(())
}

fn parse_node_row(row: &Row<'_>) -> RepoResult<ContentNode> {
    let uuid_text: String = row.get("node_uuid")?;
    let node_uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid `{uuid_text}` in content_nodes.node_uuid"))
    })?;

    let type_text: String = row.get("node_type")?;
    let node_type = ContentNodeType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid node type `{type_text}` in content_nodes.node_type"
        ))
    })?;

    Ok(ContentNode {
        node_uuid,
        path: row.get("path")?,
        parent_path: row.get("parent_path")?,
        name: row.get("name")?,
        node_type,
        sort_order: row.get("sort_order")?,
        base_version: row.get("base_version")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
