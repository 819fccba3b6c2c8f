//! Per-client project session
//!
//! One session is one participant's single logical thread of control: it
//! owns the working tree, the rendered transcript, the bus connection,
//! and the sandbox controller for that client. Inbound bus events and
//! sandbox callbacks are applied through its methods serially, so no
//! client-local locking is needed.
//!
//! Persistence discipline: every accepted local mutation of the tree is
//! followed synchronously by a whole-tree write; chat echo is optimistic
//! and applied before the store round trip resolves; a failed write is
//! logged and abandoned, leaving the optimistic state in place.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::store::ProjectStore;
use crate::transcript::{MessageBody, TranscriptEntry};
use crate::types::{MessageRecord, ProjectId, ProjectRecord, Sender, UserId, UserRecord};
use devroom_bus::{BusEvent, Connection, ConnectionId, SessionRegistry, PROJECT_MESSAGE};
use devroom_protocol::{
    build_prompt, complete, mentions_ai, AiResponse, CompletionProvider, ProjectBundle,
};
use devroom_sandbox::{RunSpec, RunState, SandboxController};
use devroom_tree::{FileTree, WorkingTree};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One participant's live view of a project room
pub struct ProjectSession {
    project: ProjectRecord,
    user: UserId,
    config: SessionConfig,
    store: Arc<dyn ProjectStore>,
    registry: Arc<SessionRegistry>,
    provider: Arc<dyn CompletionProvider>,
    controller: SandboxController,
    connection: ConnectionId,
    events: mpsc::Receiver<BusEvent>,
    working: WorkingTree,
    transcript: Vec<TranscriptEntry>,
    run_commands: Option<RunSpec>,
    closed: bool,
}

impl ProjectSession {
    /// Open a session: fetch authoritative state, then join the room.
    ///
    /// The project fetch is the only hard prerequisite; a failed
    /// transcript fetch degrades to an empty transcript, matching the
    /// store's role as the single authority clients re-fetch from.
    pub async fn open(
        project_id: ProjectId,
        user: UserId,
        store: Arc<dyn ProjectStore>,
        registry: Arc<SessionRegistry>,
        provider: Arc<dyn CompletionProvider>,
        controller: SandboxController,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let project = store.get_project(&project_id).await?;

        let records = match store.get_messages(&project_id).await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(%err, "transcript fetch failed; starting empty");
                Vec::new()
            }
        };

        let mut working = WorkingTree::new();
        working.load(project.file_tree.clone());

        // The latest bundle in history still knows how to run the project.
        let mut run_commands = None;
        let transcript: Vec<TranscriptEntry> =
            records.iter().map(TranscriptEntry::from_record).collect();
        for entry in &transcript {
            if let Some(bundle) = entry.body.bundle() {
                run_commands = Some(RunSpec::from_bundle(
                    bundle.build_command.as_ref(),
                    bundle.start_command.as_ref(),
                ));
            }
        }

        let (connection, events) = Connection::open(config.bus_capacity);
        let connection_id = connection.id();
        registry.join(project_id.as_str(), connection);
        tracing::info!(project = %project_id, %user, "session opened");

        Ok(Self {
            project,
            user,
            config,
            store,
            registry,
            provider,
            controller,
            connection: connection_id,
            events,
            working,
            transcript,
            run_commands,
            closed: false,
        })
    }

    /// Send a chat message.
    ///
    /// Empty and whitespace-only messages are rejected. The local echo is
    /// applied before the persistence round trip; a failed write keeps
    /// the optimistic state. Messages mentioning the assistant also run
    /// the AI round trip.
    pub async fn send_message(&mut self, text: &str) {
        if self.closed {
            tracing::warn!("send_message on closed session ignored");
            return;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        let record = MessageRecord::new(
            self.project.id.clone(),
            Sender::user(&self.user),
            trimmed,
        );
        self.transcript.push(TranscriptEntry::from_record(&record));
        self.persist_message(&record).await;
        self.broadcast(&record).await;

        if mentions_ai(trimmed) {
            self.ai_round_trip(trimmed).await;
        }
    }

    /// Run one assistant round trip and share the outcome with the room.
    ///
    /// The reply is guaranteed-valid JSON (the protocol layer substitutes
    /// fallbacks for malformed output, provider errors, and timeouts), so
    /// the room always receives a renderable AI message.
    async fn ai_round_trip(&mut self, text: &str) {
        let prompt = build_prompt(text);
        tracing::debug!(%prompt, "running assistant round trip");
        let reply = complete(
            self.provider.as_ref(),
            &prompt,
            self.config.provider_timeout,
        )
        .await;

        match AiResponse::parse(&reply) {
            Ok(AiResponse::ProjectBundle(ref bundle)) => {
                self.apply_bundle(bundle);
                // The originator persists the replaced tree; receivers of
                // the broadcast only load it.
                self.persist_tree().await;
            }
            Ok(AiResponse::Text { .. }) => {}
            Err(err) => {
                // Valid JSON that is not an object; rendered raw downstream.
                tracing::warn!(%err, "assistant reply parsed as JSON but not as a reply object");
            }
        }

        let record = MessageRecord::new(self.project.id.clone(), Sender::ai(), reply);
        self.transcript.push(TranscriptEntry::from_record(&record));
        self.persist_message(&record).await;
        self.broadcast(&record).await;
    }

    /// Apply an incoming broadcast to local state.
    ///
    /// A broadcast without a string sender is dropped with a warning and
    /// never rendered. AI payloads that fail to parse render as a
    /// parse-error entry and leave the tree untouched; bundles replace
    /// the tree wholesale without re-persisting it.
    pub fn handle_event(&mut self, event: BusEvent) {
        if event.name != PROJECT_MESSAGE {
            tracing::debug!(name = %event.name, "ignoring unrecognized bus event");
            return;
        }
        let Some(sender) = event.payload.get("sender").and_then(|v| v.as_str()) else {
            tracing::warn!("dropping project-message broadcast without a sender");
            return;
        };
        let sender = Sender::from(sender);
        let message = event
            .payload
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let entry = TranscriptEntry::incoming(sender, message);
        if let Some(bundle) = entry.body.bundle() {
            let bundle = bundle.clone();
            self.apply_bundle(&bundle);
        }
        self.transcript.push(entry);
    }

    /// Drain and apply all immediately available bus events
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Await the next bus event; `None` once the connection is gone
    pub async fn recv_event(&mut self) -> Option<BusEvent> {
        self.events.recv().await
    }

    /// Upsert one file and persist the whole tree
    pub async fn edit_file(&mut self, name: &str, contents: &str) {
        if self.closed {
            return;
        }
        self.working.set_file(name, contents);
        self.persist_tree().await;
    }

    /// Delete one file and persist the whole tree; true if it existed
    pub async fn remove_file(&mut self, name: &str) -> bool {
        if self.closed {
            return false;
        }
        let removed = self.working.delete_file(name);
        if removed {
            self.persist_tree().await;
        }
        removed
    }

    /// Focus a file in the editor
    pub fn open_file(&mut self, name: &str) -> bool {
        self.working.open_file(name)
    }

    /// Add members to the project.
    ///
    /// The canonical member list only updates after the store accepts
    /// the write; a failed write is logged and abandoned.
    pub async fn add_collaborators(&mut self, users: &[UserId]) {
        let mut members = self.project.members.clone();
        for user in users {
            if !members.contains(user) {
                members.push(user.clone());
            }
        }
        match self.store.put_members(&self.project.id, &members).await {
            Ok(()) => self.project.members = members,
            Err(err) => {
                tracing::error!(%err, "membership write failed; keeping previous members");
            }
        }
    }

    /// The directory of users that can be invited
    pub async fn available_users(&self) -> Vec<UserRecord> {
        match self.store.list_users().await {
            Ok(users) => users,
            Err(err) => {
                tracing::error!(%err, "user directory fetch failed");
                Vec::new()
            }
        }
    }

    /// Run the project in the sandbox.
    ///
    /// Uses the latest bundle's commands when one arrived, the npm
    /// defaults otherwise.
    pub async fn run_server(&self) {
        let spec = self.run_commands.clone().unwrap_or_default();
        self.controller.run(self.working.tree(), &spec).await;
    }

    /// Stop the current sandbox run, if any
    pub async fn stop_server(&self) {
        self.controller.kill().await;
    }

    /// Wait for the preview URL of the current run
    pub async fn wait_until_running(&self, timeout: Duration) -> Option<String> {
        self.controller.wait_until_running(timeout).await
    }

    /// Tear the session down: leave the room and kill any live run.
    ///
    /// Idempotent; orphaned sandbox processes must never outlive the
    /// session that could observe or stop them.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.registry.leave(self.project.id.as_str(), self.connection);
        self.controller.kill().await;
        tracing::info!(project = %self.project.id, user = %self.user, "session closed");
    }

    fn apply_bundle(&mut self, bundle: &ProjectBundle) {
        self.working.load(bundle.file_tree.clone());
        self.run_commands = Some(RunSpec::from_bundle(
            bundle.build_command.as_ref(),
            bundle.start_command.as_ref(),
        ));
    }

    async fn persist_tree(&self) {
        if let Err(err) = self
            .store
            .put_file_tree(&self.project.id, self.working.tree())
            .await
        {
            tracing::error!(%err, "file tree write failed; keeping local state");
        }
    }

    async fn persist_message(&self, record: &MessageRecord) {
        if let Err(err) = self.store.append_message(record).await {
            tracing::error!(%err, "message write failed; keeping optimistic transcript");
        }
    }

    async fn broadcast(&self, record: &MessageRecord) {
        let event = BusEvent::project_message(record.sender.as_str(), &record.message);
        self.registry
            .publish(self.project.id.as_str(), self.connection, &event)
            .await;
    }

    /// Project record as last confirmed by the store
    #[inline]
    #[must_use]
    pub fn project(&self) -> &ProjectRecord {
        &self.project
    }

    /// This participant's user id
    #[inline]
    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Bus connection identity
    #[inline]
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection
    }

    /// Rendered transcript in display order
    #[inline]
    #[must_use]
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// The shared file tree
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &FileTree {
        self.working.tree()
    }

    /// Active file in the editor
    #[inline]
    #[must_use]
    pub fn active_file(&self) -> Option<&str> {
        self.working.active_file()
    }

    /// Open editor tabs
    #[inline]
    #[must_use]
    pub fn open_files(&self) -> &[String] {
        self.working.open_files()
    }

    /// Current sandbox run state
    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.controller.state()
    }

    /// Preview URL when the sandbox reports ready
    #[must_use]
    pub fn preview_url(&self) -> Option<String> {
        self.controller.preview_url()
    }

    /// Whether the sandbox capability exists in this environment
    #[must_use]
    pub fn sandbox_available(&self) -> bool {
        self.controller.available()
    }

    /// Commands the next run will use, when a bundle specified them
    #[inline]
    #[must_use]
    pub fn run_commands(&self) -> Option<&RunSpec> {
        self.run_commands.as_ref()
    }

    /// Latest parse-error entry, if the last AI payload was malformed
    #[must_use]
    pub fn last_parse_error(&self) -> Option<&TranscriptEntry> {
        self.transcript
            .iter()
            .rev()
            .find(|entry| matches!(entry.body, MessageBody::Malformed { .. }))
    }
}
