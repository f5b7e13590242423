//! Session identities and session providers.
//!
//! # Responsibility
//! - Describe who a repository session acts for.
//! - Open one repository session per accessor instance.
//!
//! # Invariants
//! - A session is only handed out for a well-formed identity.
//! - Every opened session starts its own transaction.

use crate::db::{open_db, open_db_in_memory};
use crate::repo::content_repo::{RepoError, RepoResult, RepositoryAccess, SqliteRepositoryAccess};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static USER_LOGIN_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.@-]{1,255}$").expect("valid user login id regex"));

/// User login a repository session is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_login_id: String,
}

impl Identity {
    pub fn new(user_login_id: impl Into<String>) -> Self {
        Self {
            user_login_id: user_login_id.into(),
        }
    }

    pub fn user_login_id(&self) -> &str {
        &self.user_login_id
    }

    /// Checks the login id shape.
    ///
    /// Returns a human-readable reason when the identity is unusable.
    pub fn validate(&self) -> Result<(), String> {
        if self.user_login_id.trim().is_empty() {
            return Err("user login id must not be blank".to_string());
        }
        if !USER_LOGIN_ID_RE.is_match(&self.user_login_id) {
            return Err(format!(
                "user login id `{}` contains unsupported characters",
                self.user_login_id.escape_debug()
            ));
        }
        Ok(())
    }
}

/// Opens repository sessions for identities.
pub trait SessionProvider {
    type Session: RepositoryAccess;

    /// Opens a new session scoped to `identity`.
    ///
    /// # Errors
    /// - `RepoError::Authentication` when the identity is rejected.
    fn open_session(&self, identity: &Identity) -> RepoResult<Self::Session>;
}

/// Storage location of a SQLite repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLocation {
    File(PathBuf),
    /// Fresh, private repository per session.
    InMemory,
}

/// Session provider backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteSessionProvider {
    location: RepositoryLocation,
}

impl SqliteSessionProvider {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            location: RepositoryLocation::File(path.as_ref().to_path_buf()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: RepositoryLocation::InMemory,
        }
    }

    pub fn location(&self) -> &RepositoryLocation {
        &self.location
    }
}

impl SessionProvider for SqliteSessionProvider {
    type Session = SqliteRepositoryAccess;

    fn open_session(&self, identity: &Identity) -> RepoResult<Self::Session> {
        // Reject before touching storage.
        identity.validate().map_err(RepoError::Authentication)?;

        let conn = match &self.location {
            RepositoryLocation::File(path) => open_db(path)?,
            RepositoryLocation::InMemory => open_db_in_memory()?,
        };
        SqliteRepositoryAccess::login(conn, identity)
    }
}
