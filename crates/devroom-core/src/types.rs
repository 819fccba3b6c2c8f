//! Core identifiers and persisted record shapes
//!
//! Project and user ids come from the external store and stay opaque
//! strings; message ids are minted locally (ULID for sortability). Record
//! layouts match what the store persists:
//! - project: `{id, name, members[], fileTree{name -> {file:{contents}}}}`
//! - message: `{id, projectId, sender, message, timestamp}`

use chrono::{DateTime, Utc};
use devroom_tree::FileTree;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque project identifier from the store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    /// Wrap a store identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a room key
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque user identifier from the store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Wrap a store identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique message identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Ulid);

impl MessageId {
    /// Generate a new message ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message sender: a user id or the reserved machine sentinel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sender(String);

impl Sender {
    /// The reserved sender identity marking machine-generated messages
    pub const AI: &'static str = "ai";

    /// A human sender
    #[inline]
    #[must_use]
    pub fn user(id: &UserId) -> Self {
        Self(id.as_str().to_owned())
    }

    /// The assistant sender
    #[inline]
    #[must_use]
    pub fn ai() -> Self {
        Self(Self::AI.to_owned())
    }

    /// Whether this message is machine-generated
    #[inline]
    #[must_use]
    pub fn is_ai(&self) -> bool {
        self.0 == Self::AI
    }

    /// Sender identity as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Sender {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Persisted project record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Store identifier
    pub id: ProjectId,
    /// Display name
    pub name: String,
    /// Member user ids
    #[serde(default)]
    pub members: Vec<UserId>,
    /// Last persisted tree snapshot
    #[serde(rename = "fileTree", default)]
    pub file_tree: FileTree,
}

impl ProjectRecord {
    /// Create a record with an empty tree
    #[must_use]
    pub fn new(id: ProjectId, name: impl Into<String>, members: Vec<UserId>) -> Self {
        Self {
            id,
            name: name.into(),
            members,
            file_tree: FileTree::new(),
        }
    }
}

/// Persisted chat message; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Message identifier
    pub id: MessageId,
    /// Owning project
    pub project_id: ProjectId,
    /// Sender identity (user id or the `"ai"` sentinel)
    pub sender: Sender,
    /// Plain string, or a serialized AI reply when the sender is the
    /// sentinel
    pub message: String,
    /// Arrival timestamp
    pub timestamp: DateTime<Utc>,
}

impl MessageRecord {
    /// Stamp a new message
    #[must_use]
    pub fn new(project_id: ProjectId, sender: Sender, message: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            project_id,
            sender,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Directory entry of a known user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Store identifier
    pub id: UserId,
    /// Contact address shown in the collaborator picker
    pub email: String,
}
