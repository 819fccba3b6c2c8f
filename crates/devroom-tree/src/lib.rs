//! Devroom Tree - the shared file tree document
//!
//! The per-project file tree that chat participants and the AI assistant
//! edit together:
//! - Flat namespace: file name → contents, no directories
//! - Wholesale replace on project open and on incoming AI bundles
//! - Single-entry upsert/delete for local edits
//! - Active-file and open-files pointers for the editing surface

#![warn(unreachable_pub)]

pub mod tree;
pub mod working;

pub use tree::{is_flat_name, FileBody, FileEntry, FileTree};
pub use working::WorkingTree;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
