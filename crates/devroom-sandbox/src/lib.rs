//! Devroom Sandbox - ephemeral execution of the shared file tree
//!
//! Drives one sandboxed run of the project at a time:
//! - Mount the current tree, install if `package.json` is present, start
//!   the server, surface the preview URL on the readiness signal
//! - At most one live process tree per client; a new run kills the
//!   previous one strictly before mounting
//! - Process output is forwarded fire-and-forget; only the install exit
//!   code gates pipeline progression
//! - The capability may be absent entirely; the controller then degrades
//!   to a logged no-op instead of failing call sites
//!
//! Runs are ephemeral and never persisted.

#![warn(unreachable_pub)]

pub mod capability;
pub mod controller;
pub mod sim;
pub mod state;

pub use capability::{ProcessHandle, ProcessId, ReadySignal, RunId, Sandbox, SandboxError};
pub use controller::{RunSpec, SandboxController};
pub use sim::SimSandbox;
pub use state::{validate_transition, RunState, StateError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
