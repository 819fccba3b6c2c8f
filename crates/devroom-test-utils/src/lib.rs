//! Testing utilities for the devroom workspace
//!
//! Shared fixtures and session builders over the core harness.

#![allow(missing_docs)]

use devroom_bus::SessionRegistry;
use devroom_core::harness::{InMemoryStore, ScriptedProvider};
use devroom_core::{ProjectId, ProjectRecord, ProjectSession, SessionConfig, UserId, UserRecord};
use devroom_sandbox::SandboxController;
use devroom_tree::FileTree;
use std::sync::Arc;

pub use devroom_core::harness::{express_reply, greeting_reply, NeverProvider};

/// Everything a session test needs to wire by hand
pub struct TestRoom {
    pub project_id: ProjectId,
    pub store: Arc<InMemoryStore>,
    pub registry: Arc<SessionRegistry>,
    pub provider: Arc<ScriptedProvider>,
}

impl TestRoom {
    /// A seeded room with two members, alice and bob
    pub fn new() -> Self {
        let project_id = ProjectId::new("p-test");
        let store = Arc::new(InMemoryStore::new());
        store.insert_project(ProjectRecord::new(
            project_id.clone(),
            "test project",
            vec![UserId::new("alice"), UserId::new("bob")],
        ));
        store.insert_user(UserRecord {
            id: UserId::new("alice"),
            email: "alice@example.com".to_owned(),
        });
        store.insert_user(UserRecord {
            id: UserId::new("bob"),
            email: "bob@example.com".to_owned(),
        });
        Self {
            project_id,
            store,
            registry: Arc::new(SessionRegistry::new()),
            provider: Arc::new(ScriptedProvider::new()),
        }
    }

    /// Open a session for a user with the given controller
    pub async fn open_session(&self, user: &str, controller: SandboxController) -> ProjectSession {
        ProjectSession::open(
            self.project_id.clone(),
            UserId::new(user),
            self.store.clone(),
            self.registry.clone(),
            self.provider.clone(),
            controller,
            SessionConfig::new(),
        )
        .await
        .expect("seeded project opens")
    }
}

impl Default for TestRoom {
    fn default() -> Self {
        Self::new()
    }
}

/// Small tree with a server file and a manifest
pub fn express_tree() -> FileTree {
    FileTree::from_iter([
        ("app.js".to_owned(), "server code".to_owned()),
        ("package.json".to_owned(), "{}".to_owned()),
    ])
}

/// Raw AI reply that is JSON but not a reply object
pub fn non_object_reply() -> String {
    "[1, 2, 3]".to_owned()
}
