//! The sandbox capability boundary
//!
//! The sandbox itself is external: something that can mount a file tree
//! and spawn process-like units with streamed output and a reachable
//! preview URL. A spawned unit is addressed by its [`ProcessId`]; killing
//! goes through the capability so the sandbox can reap whatever backs the
//! process.

use devroom_tree::FileTree;
use tokio::sync::{broadcast, mpsc, oneshot};
use ulid::Ulid;

/// Unique identifier of one spawned process-like unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub Ulid);

impl ProcessId {
    /// Generate a new process ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of one sandbox run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate a new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a spawned process: its output stream and exit future.
///
/// Both halves are explicit, cancellable primitives: dropping the handle
/// tears the subscriptions down deterministically.
#[derive(Debug)]
pub struct ProcessHandle {
    /// Process identity, used with [`Sandbox::kill`]
    pub id: ProcessId,
    /// Streamed output lines for the process lifetime
    pub output: mpsc::Receiver<String>,
    /// Resolves once with the exit code
    pub exit: oneshot::Receiver<i32>,
}

/// The readiness signal: the server inside the sandbox is reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadySignal {
    /// Listening port inside the sandbox
    pub port: u16,
    /// Externally reachable preview URL
    pub url: String,
}

/// Failures at the sandbox boundary
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Mounting the tree failed
    #[error("mount failed: {0}")]
    Mount(String),
    /// Writing a single file failed
    #[error("write failed: {0}")]
    Write(String),
    /// Spawning a process failed
    #[error("spawn failed: {0}")]
    Spawn(String),
    /// The capability is not usable in this environment
    #[error("sandbox unavailable: {0}")]
    Unavailable(String),
}

/// An ephemeral, isolated execution environment
#[async_trait::async_trait]
pub trait Sandbox: Send + Sync {
    /// Mount a file tree, replacing whatever was mounted before
    async fn mount(&self, tree: &FileTree) -> Result<(), SandboxError>;

    /// Write one file into the mounted tree
    async fn write_file(&self, path: &str, contents: &str) -> Result<(), SandboxError>;

    /// Spawn a process-like unit
    async fn spawn(&self, program: &str, args: &[String]) -> Result<ProcessHandle, SandboxError>;

    /// Terminate a spawned unit; unknown IDs are ignored
    async fn kill(&self, process: ProcessId) -> Result<(), SandboxError>;

    /// Subscribe to readiness signals
    fn subscribe_ready(&self) -> broadcast::Receiver<ReadySignal>;

    /// Preview URL once the sandbox reported one
    fn url(&self) -> Option<String>;
}
