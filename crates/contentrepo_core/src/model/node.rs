//! Repository node read model.

use crate::model::article::ArticleRecord;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable content node identifier.
pub type ContentNodeId = Uuid;

/// Node types known by the content repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentNodeType {
    /// Structural node; created implicitly for missing ancestors.
    Folder,
    /// Versioned localized article.
    Article,
}

impl ContentNodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Article => "article",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "folder" => Some(Self::Folder),
            "article" => Some(Self::Article),
            _ => None,
        }
    }
}

impl Display for ContentNodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the content tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    pub node_uuid: ContentNodeId,
    /// Canonical content path.
    pub path: String,
    /// `None` only for the root.
    pub parent_path: Option<String>,
    /// Last path segment; empty for the root.
    pub name: String,
    pub node_type: ContentNodeType,
    /// Order among siblings, insertion based.
    pub sort_order: i64,
    /// Newest version name; `None` for folders.
    pub base_version: Option<String>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Typed mapping of a fetched node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentObject {
    Article(ArticleRecord),
    /// Any node that does not map onto an article.
    Node(ContentNode),
}

impl ContentObject {
    pub fn node_type(&self) -> ContentNodeType {
        match self {
            Self::Article(_) => ContentNodeType::Article,
            Self::Node(node) => node.node_type,
        }
    }
}
