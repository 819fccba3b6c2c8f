//! Devroom Core - project session orchestration
//!
//! Ties the room together for one client:
//! - Joins the bus room and renders incoming broadcasts
//! - Runs the assistant round trip on `@ai` mentions
//! - Keeps the shared file tree persisted after every local transition
//! - Owns the sandbox controller and tears it down on close
//!
//! # Example
//!
//! ```rust,ignore
//! use devroom_core::prelude::*;
//!
//! # async fn example(store: std::sync::Arc<dyn ProjectStore>,
//! #                  registry: std::sync::Arc<devroom_bus::SessionRegistry>,
//! #                  provider: std::sync::Arc<dyn devroom_protocol::CompletionProvider>,
//! #                  controller: devroom_sandbox::SandboxController)
//! #                  -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = ProjectSession::open(
//!     ProjectId::new("p1"),
//!     UserId::new("u1"),
//!     store, registry, provider, controller,
//!     SessionConfig::new(),
//! ).await?;
//!
//! session.send_message("@ai Create an express application").await;
//! session.run_server().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod config;
pub mod error;
pub mod harness;
pub mod session;
pub mod store;
pub mod transcript;
pub mod types;

// Re-exports for convenience
pub use config::SessionConfig;
pub use error::SessionError;
pub use session::ProjectSession;
pub use store::{ProjectStore, StoreError};
pub use transcript::{MessageBody, TranscriptEntry};
pub use types::{
    MessageId, MessageRecord, ProjectId, ProjectRecord, Sender, UserId, UserRecord,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with devroom sessions
    pub use crate::{
        MessageBody, ProjectId, ProjectRecord, ProjectSession, ProjectStore, SessionConfig,
        SessionError, TranscriptEntry, UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
