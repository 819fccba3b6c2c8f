//! In-memory sandbox capability
//!
//! Backs the controller's tests and the scripted session simulator with a
//! deterministic sandbox: every boundary call lands in an ordered op log,
//! spawn exits are scripted, and readiness is triggered by hand.

use crate::capability::{ProcessHandle, ProcessId, ReadySignal, Sandbox, SandboxError};
use devroom_tree::FileTree;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tokio::sync::{broadcast, mpsc, oneshot};

struct SimProcess {
    exit_tx: oneshot::Sender<i32>,
    // Held so the output stream stays open for the process lifetime.
    _output_tx: mpsc::Sender<String>,
}

/// Deterministic sandbox for tests and simulation
pub struct SimSandbox {
    ops: Mutex<Vec<String>>,
    scripted_exits: Mutex<VecDeque<i32>>,
    mount_failure: Mutex<Option<String>>,
    live: Mutex<HashMap<ProcessId, SimProcess>>,
    ready_tx: broadcast::Sender<ReadySignal>,
    url: Mutex<Option<String>>,
}

impl SimSandbox {
    /// Create a sandbox with an empty script
    #[must_use]
    pub fn new() -> Self {
        let (ready_tx, _) = broadcast::channel(16);
        Self {
            ops: Mutex::new(Vec::new()),
            scripted_exits: Mutex::new(VecDeque::new()),
            mount_failure: Mutex::new(None),
            live: Mutex::new(HashMap::new()),
            ready_tx,
            url: Mutex::new(None),
        }
    }

    /// Script the next spawn to exit immediately with this code.
    ///
    /// Spawns with no scripted code stay alive until killed, like a
    /// server process.
    pub fn script_exit(&self, code: i32) {
        self.scripted_exits.lock().push_back(code);
    }

    /// Script the next mount to fail
    pub fn fail_next_mount(&self, reason: impl Into<String>) {
        *self.mount_failure.lock() = Some(reason.into());
    }

    /// Announce server readiness to all subscribers
    pub fn trigger_ready(&self, port: u16, url: impl Into<String>) {
        let url = url.into();
        *self.url.lock() = Some(url.clone());
        let _ = self.ready_tx.send(ReadySignal { port, url });
    }

    /// Ordered log of boundary calls
    #[must_use]
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().clone()
    }

    /// Number of processes still alive
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    fn record(&self, op: impl Into<String>) {
        self.ops.lock().push(op.into());
    }
}

impl Default for SimSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Sandbox for SimSandbox {
    async fn mount(&self, _tree: &FileTree) -> Result<(), SandboxError> {
        self.record("mount");
        if let Some(reason) = self.mount_failure.lock().take() {
            return Err(SandboxError::Mount(reason));
        }
        Ok(())
    }

    async fn write_file(&self, path: &str, _contents: &str) -> Result<(), SandboxError> {
        self.record(format!("write {path}"));
        Ok(())
    }

    async fn spawn(&self, program: &str, args: &[String]) -> Result<ProcessHandle, SandboxError> {
        let mut op = format!("spawn {program}");
        for arg in args {
            op.push(' ');
            op.push_str(arg);
        }
        self.record(op);

        let id = ProcessId::new();
        let (output_tx, output_rx) = mpsc::channel(64);
        let (exit_tx, exit_rx) = oneshot::channel();

        let mut line = format!("$ {program}");
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        let _ = output_tx.try_send(line);

        match self.scripted_exits.lock().pop_front() {
            Some(code) => {
                // Short-lived process: exits before the handle is used.
                let _ = exit_tx.send(code);
            }
            None => {
                self.live.lock().insert(
                    id,
                    SimProcess {
                        exit_tx,
                        _output_tx: output_tx,
                    },
                );
            }
        }

        Ok(ProcessHandle {
            id,
            output: output_rx,
            exit: exit_rx,
        })
    }

    async fn kill(&self, process: ProcessId) -> Result<(), SandboxError> {
        self.record("kill");
        if let Some(sim) = self.live.lock().remove(&process) {
            let _ = sim.exit_tx.send(-1);
        }
        Ok(())
    }

    fn subscribe_ready(&self) -> broadcast::Receiver<ReadySignal> {
        self.ready_tx.subscribe()
    }

    fn url(&self) -> Option<String> {
        self.url.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn scripted_spawn_exits_immediately() {
        let sim = SimSandbox::new();
        sim.script_exit(0);
        let handle = sim.spawn("npm", &["install".to_owned()]).await.unwrap();
        assert_eq!(handle.exit.await.unwrap(), 0);
        assert_eq!(sim.live_count(), 0);
    }

    #[tokio::test]
    async fn unscripted_spawn_lives_until_killed() {
        let sim = SimSandbox::new();
        let handle = sim.spawn("node", &["app.js".to_owned()]).await.unwrap();
        assert_eq!(sim.live_count(), 1);

        sim.kill(handle.id).await.unwrap();
        assert_eq!(sim.live_count(), 0);
        assert_eq!(handle.exit.await.unwrap(), -1);
    }

    #[tokio::test]
    async fn spawn_echoes_the_command_line() {
        let sim = SimSandbox::new();
        let mut handle = sim
            .spawn("npm", &["run".to_owned(), "dev".to_owned()])
            .await
            .unwrap();
        assert_eq!(handle.output.recv().await.unwrap(), "$ npm run dev");
    }

    #[tokio::test]
    async fn single_file_writes_are_logged() {
        let sim = SimSandbox::new();
        sim.write_file("app.js", "contents").await.unwrap();
        assert_eq!(sim.ops(), vec!["write app.js"]);
    }

    #[tokio::test]
    async fn readiness_reaches_subscribers_and_sets_url() {
        let sim = SimSandbox::new();
        let mut rx = sim.subscribe_ready();
        sim.trigger_ready(3000, "http://localhost:3000");

        let signal = rx.recv().await.unwrap();
        assert_eq!(signal.port, 3000);
        assert_eq!(signal.url, "http://localhost:3000");
        assert_eq!(sim.url().as_deref(), Some("http://localhost:3000"));
    }
}
