//! The durable store boundary
//!
//! Storage is external; the session only needs a get/put surface over
//! projects, messages, and the user directory. Writes are
//! last-writer-wins with no version check — concurrent editors can race
//! at this boundary and silently overwrite one another, a documented
//! trade-off of the design, not a defect to fix here.

use crate::types::{MessageRecord, ProjectId, ProjectRecord, UserId, UserRecord};
use devroom_tree::FileTree;

/// Store-side failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No such project
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),
    /// The call did not complete
    #[error("store transport failed: {0}")]
    Transport(String),
}

/// Durable project/message store
#[async_trait::async_trait]
pub trait ProjectStore: Send + Sync {
    /// Fetch a project record
    async fn get_project(&self, id: &ProjectId) -> Result<ProjectRecord, StoreError>;

    /// Persist the whole tree snapshot (last-writer-wins)
    async fn put_file_tree(&self, id: &ProjectId, tree: &FileTree) -> Result<(), StoreError>;

    /// Persist the member list
    async fn put_members(&self, id: &ProjectId, members: &[UserId]) -> Result<(), StoreError>;

    /// Fetch a project's transcript in arrival order
    async fn get_messages(&self, project: &ProjectId) -> Result<Vec<MessageRecord>, StoreError>;

    /// Append one message; messages are never mutated afterwards
    async fn append_message(&self, message: &MessageRecord) -> Result<(), StoreError>;

    /// The directory of known users
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;
}
