//! Per-client run controller
//!
//! Owns at most one live process tree and the pipeline that produces it:
//! kill previous → mount → install (exit-code gated) → start → ready.
//! The controller is an explicitly owned resource of the session that
//! created it, acquired on open and released on close — never a
//! module-level singleton.

use crate::capability::{ProcessHandle, ReadySignal, RunId, Sandbox};
use crate::state::{validate_transition, RunState};
use devroom_protocol::RunCommand;
use devroom_tree::FileTree;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Tree entry whose presence triggers the install step
const PACKAGE_MANIFEST: &str = "package.json";

/// Captured reason for an install that exited non-zero
const INSTALL_FAILED: &str = "install failed";

/// Install and start commands for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Run to completion before the server starts
    pub install: RunCommand,
    /// Long-running server command
    pub start: RunCommand,
}

impl RunSpec {
    /// The fallback commands used when no bundle specified any
    #[must_use]
    pub fn npm_defaults() -> Self {
        Self {
            install: RunCommand::new("npm", ["install"]),
            start: RunCommand::new("npm", ["start"]),
        }
    }

    /// Commands from an AI bundle, falling back per side to the defaults
    #[must_use]
    pub fn from_bundle(build: Option<&RunCommand>, start: Option<&RunCommand>) -> Self {
        let defaults = Self::npm_defaults();
        Self {
            install: build.cloned().unwrap_or(defaults.install),
            start: start.cloned().unwrap_or(defaults.start),
        }
    }
}

impl Default for RunSpec {
    fn default() -> Self {
        Self::npm_defaults()
    }
}

/// The run currently holding the sandbox
#[derive(Debug)]
struct LiveRun {
    id: RunId,
    process: crate::capability::ProcessId,
    tasks: Vec<JoinHandle<()>>,
}

#[derive(Debug)]
struct Inner {
    state: watch::Sender<RunState>,
    live: Mutex<Option<LiveRun>>,
    sink: Mutex<Option<mpsc::Sender<String>>>,
}

impl Inner {
    fn set_state(&self, to: RunState) {
        let current = self.state.borrow().clone();
        if let Err(err) = validate_transition(&current, &to) {
            tracing::error!(%err, "refusing illegal run state transition");
            return;
        }
        tracing::debug!(from = %current, to = %to, "run state transition");
        self.state.send_replace(to);
    }

    fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(%reason, "sandbox pipeline aborted");
        self.set_state(RunState::Failed(reason));
    }

    /// Forward a process's output for its lifetime. Fire-and-forget: the
    /// pipeline never waits on this task.
    fn spawn_drain(
        self: &Arc<Self>,
        mut output: mpsc::Receiver<String>,
        stage: &'static str,
    ) -> JoinHandle<()> {
        let sink = self.sink.lock().clone();
        tokio::spawn(async move {
            while let Some(line) = output.recv().await {
                tracing::info!(target: "devroom::sandbox", stage, "{line}");
                if let Some(sink) = &sink {
                    let _ = sink.send(line).await;
                }
            }
        })
    }
}

/// Drives sandbox runs for one client
pub struct SandboxController {
    sandbox: Option<Arc<dyn Sandbox>>,
    offline_reason: Option<String>,
    inner: Arc<Inner>,
}

impl SandboxController {
    /// Controller over a live capability
    #[must_use]
    pub fn new(sandbox: Arc<dyn Sandbox>) -> Self {
        Self {
            sandbox: Some(sandbox),
            offline_reason: None,
            inner: Self::make_inner(),
        }
    }

    /// Controller for an environment without the capability.
    ///
    /// Every run request degrades to a logged no-op carrying the reason;
    /// call sites never have to branch.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            sandbox: None,
            offline_reason: Some(reason.into()),
            inner: Self::make_inner(),
        }
    }

    /// Also forward process output to this sink
    #[must_use]
    pub fn with_output_sink(self, sink: mpsc::Sender<String>) -> Self {
        *self.inner.sink.lock() = Some(sink);
        self
    }

    fn make_inner() -> Arc<Inner> {
        let (state_tx, _) = watch::channel(RunState::Idle);
        Arc::new(Inner {
            state: state_tx,
            live: Mutex::new(None),
            sink: Mutex::new(None),
        })
    }

    /// Whether the capability exists in this environment
    #[inline]
    #[must_use]
    pub fn available(&self) -> bool {
        self.sandbox.is_some()
    }

    /// Why the capability is absent, when it is
    #[inline]
    #[must_use]
    pub fn offline_reason(&self) -> Option<&str> {
        self.offline_reason.as_deref()
    }

    /// Current run state
    #[must_use]
    pub fn state(&self) -> RunState {
        self.inner.state.borrow().clone()
    }

    /// Watch run state changes
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.inner.state.subscribe()
    }

    /// Preview URL when running
    #[must_use]
    pub fn preview_url(&self) -> Option<String> {
        self.state().preview_url().map(str::to_owned)
    }

    /// Start (or restart) the pipeline over the given tree.
    ///
    /// Callable from any state. A previous run is killed strictly before
    /// the new tree is mounted, so at most one process tree is ever live.
    /// Failures land in `Failed(reason)` instead of propagating; a later
    /// call restarts from scratch regardless.
    pub async fn run(&self, tree: &FileTree, spec: &RunSpec) {
        let Some(sandbox) = self.sandbox.clone() else {
            let reason = self.offline_reason.as_deref().unwrap_or("not configured");
            tracing::warn!(%reason, "sandbox capability unavailable; run request ignored");
            return;
        };

        let run_id = RunId::new();
        tracing::info!(run = %run_id, "starting sandbox run");

        // Kill-before-mount invariant.
        self.terminate_live(&sandbox).await;

        self.inner.set_state(RunState::Mounting);
        if let Err(err) = sandbox.mount(tree).await {
            self.inner.fail(format!("mount failed: {err}"));
            return;
        }

        if tree.contains(PACKAGE_MANIFEST) {
            self.inner.set_state(RunState::Installing);
            let handle = match sandbox.spawn(&spec.install.program, &spec.install.args).await {
                Ok(handle) => handle,
                Err(err) => {
                    self.inner.fail(format!("spawn failed: {err}"));
                    return;
                }
            };
            let ProcessHandle { output, exit, .. } = handle;
            // Install output closes itself on exit; no teardown handle kept.
            let _ = self.inner.spawn_drain(output, "install");

            // The one blocking await of the pipeline: the install exit code
            // gates the server start.
            match exit.await {
                Ok(0) => {}
                Ok(code) => {
                    tracing::warn!(code, command = %spec.install, "install exited non-zero");
                    self.inner.fail(INSTALL_FAILED);
                    return;
                }
                Err(_) => {
                    self.inner.fail(INSTALL_FAILED);
                    return;
                }
            }
        }

        self.inner.set_state(RunState::Starting);
        // Subscribe before the server spawns so an instant signal is not lost.
        let mut ready_rx = sandbox.subscribe_ready();
        let handle = match sandbox.spawn(&spec.start.program, &spec.start.args).await {
            Ok(handle) => handle,
            Err(err) => {
                self.inner.fail(format!("spawn failed: {err}"));
                return;
            }
        };
        let ProcessHandle {
            id: process,
            output,
            ..
        } = handle;
        let drain = self.inner.spawn_drain(output, "server");

        let ready = {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                // First signal wins; the subscription dies with the run.
                if let Ok(ReadySignal { port, url }) = ready_rx.recv().await {
                    tracing::info!(port, %url, "server ready");
                    inner.set_state(RunState::Running(url));
                }
            })
        };

        *self.inner.live.lock() = Some(LiveRun {
            id: run_id,
            process,
            tasks: vec![drain, ready],
        });
    }

    /// Terminate the current run, if any, and settle in `Stopped`.
    ///
    /// Idempotent: with no active run (including never-ran and
    /// already-stopped controllers) this only pins the state.
    pub async fn kill(&self) {
        if let Some(sandbox) = self.sandbox.clone() {
            self.terminate_live(&sandbox).await;
        }
        self.inner.set_state(RunState::Stopped);
    }

    /// Wait until the run reports ready, returning the preview URL
    pub async fn wait_until_running(&self, timeout: Duration) -> Option<String> {
        let mut rx = self.inner.state.subscribe();
        let wait = async move {
            loop {
                if let Some(url) = rx.borrow_and_update().preview_url() {
                    return Some(url.to_owned());
                }
                if rx.changed().await.is_err() {
                    return None;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }

    async fn terminate_live(&self, sandbox: &Arc<dyn Sandbox>) {
        let live = self.inner.live.lock().take();
        if let Some(run) = live {
            tracing::debug!(run = %run.id, "tearing down live run");
            for task in &run.tasks {
                task.abort();
            }
            if let Err(err) = sandbox.kill(run.process).await {
                tracing::warn!(%err, "failed to kill sandboxed process");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimSandbox;
    use pretty_assertions::assert_eq;

    fn express_tree() -> FileTree {
        FileTree::from_iter([
            ("app.js".to_owned(), "server code".to_owned()),
            ("package.json".to_owned(), "{}".to_owned()),
        ])
    }

    fn bundle_spec() -> RunSpec {
        RunSpec {
            install: RunCommand::new("npm", ["install"]),
            start: RunCommand::new("node", ["app.js"]),
        }
    }

    #[tokio::test]
    async fn install_exit_gates_the_server_start() {
        let sim = Arc::new(SimSandbox::new());
        sim.script_exit(0);
        let controller = SandboxController::new(sim.clone());

        controller.run(&express_tree(), &bundle_spec()).await;

        assert_eq!(controller.state(), RunState::Starting);
        assert_eq!(
            sim.ops(),
            vec!["mount", "spawn npm install", "spawn node app.js"]
        );
    }

    #[tokio::test]
    async fn readiness_signal_yields_running_url() {
        let sim = Arc::new(SimSandbox::new());
        sim.script_exit(0);
        let controller = SandboxController::new(sim.clone());

        controller.run(&express_tree(), &bundle_spec()).await;
        sim.trigger_ready(3000, "http://localhost:3000");

        let url = controller
            .wait_until_running(Duration::from_secs(1))
            .await
            .expect("server becomes ready");
        assert_eq!(url, "http://localhost:3000");
        assert_eq!(controller.preview_url().as_deref(), Some("http://localhost:3000"));
    }

    #[tokio::test]
    async fn failed_install_halts_the_pipeline() {
        let sim = Arc::new(SimSandbox::new());
        sim.script_exit(1);
        let controller = SandboxController::new(sim.clone());

        controller.run(&express_tree(), &bundle_spec()).await;

        assert_eq!(
            controller.state(),
            RunState::Failed("install failed".to_owned())
        );
        assert!(!sim.ops().iter().any(|op| op == "spawn node app.js"));
    }

    #[tokio::test]
    async fn tree_without_manifest_skips_install() {
        let sim = Arc::new(SimSandbox::new());
        let controller = SandboxController::new(sim.clone());
        let tree = FileTree::from_iter([("index.html".to_owned(), "<html>".to_owned())]);

        controller.run(&tree, &RunSpec::npm_defaults()).await;

        assert_eq!(sim.ops(), vec!["mount", "spawn npm start"]);
        assert_eq!(controller.state(), RunState::Starting);
    }

    #[tokio::test]
    async fn rerun_kills_previous_before_mounting() {
        let sim = Arc::new(SimSandbox::new());
        let controller = SandboxController::new(sim.clone());
        let tree = FileTree::from_iter([("index.html".to_owned(), "x".to_owned())]);

        controller.run(&tree, &RunSpec::npm_defaults()).await;
        sim.trigger_ready(3000, "http://localhost:3000");
        controller
            .wait_until_running(Duration::from_secs(1))
            .await
            .expect("first run reaches ready");

        controller.run(&tree, &RunSpec::npm_defaults()).await;

        let ops = sim.ops();
        let kill = ops.iter().position(|op| op == "kill").expect("kill recorded");
        let second_mount = ops
            .iter()
            .enumerate()
            .filter(|(_, op)| *op == "mount")
            .map(|(idx, _)| idx)
            .nth(1)
            .expect("second mount recorded");
        assert!(kill < second_mount, "kill must precede the new mount: {ops:?}");
    }

    #[tokio::test]
    async fn kill_is_idempotent() {
        let sim = Arc::new(SimSandbox::new());
        let controller = SandboxController::new(sim.clone());
        let tree = FileTree::from_iter([("index.html".to_owned(), "x".to_owned())]);

        controller.run(&tree, &RunSpec::npm_defaults()).await;
        controller.kill().await;
        controller.kill().await;
        assert_eq!(controller.state(), RunState::Stopped);

        // Never-ran controller: kill still settles in Stopped, no error.
        let fresh = SandboxController::new(Arc::new(SimSandbox::new()));
        fresh.kill().await;
        fresh.kill().await;
        assert_eq!(fresh.state(), RunState::Stopped);
    }

    #[tokio::test]
    async fn mount_failure_captures_reason() {
        let sim = Arc::new(SimSandbox::new());
        sim.fail_next_mount("disk full");
        let controller = SandboxController::new(sim.clone());

        controller.run(&express_tree(), &bundle_spec()).await;

        match controller.state() {
            RunState::Failed(reason) => assert!(reason.contains("disk full")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_run_can_be_retried_from_scratch() {
        let sim = Arc::new(SimSandbox::new());
        sim.fail_next_mount("transient");
        let controller = SandboxController::new(sim.clone());

        controller.run(&express_tree(), &bundle_spec()).await;
        assert!(matches!(controller.state(), RunState::Failed(_)));

        sim.script_exit(0);
        controller.run(&express_tree(), &bundle_spec()).await;
        assert_eq!(controller.state(), RunState::Starting);
    }

    #[tokio::test]
    async fn unavailable_capability_degrades_to_no_op() {
        let controller = SandboxController::unavailable("sandbox disabled in this deployment");

        controller.run(&express_tree(), &bundle_spec()).await;

        assert!(!controller.available());
        assert_eq!(controller.state(), RunState::Idle);
        assert_eq!(
            controller.offline_reason(),
            Some("sandbox disabled in this deployment")
        );
    }

    #[tokio::test]
    async fn output_reaches_the_sink() {
        let sim = Arc::new(SimSandbox::new());
        let controller = SandboxController::new(sim.clone());
        let (tx, mut rx) = mpsc::channel(16);
        let controller = controller.with_output_sink(tx);
        let tree = FileTree::from_iter([("index.html".to_owned(), "x".to_owned())]);

        controller.run(&tree, &RunSpec::npm_defaults()).await;

        let line = rx.recv().await.expect("forwarded output line");
        assert!(line.contains("npm start"), "unexpected line: {line}");
    }
}
