#![deny(missing_docs)]
//! # rlm — Recursive Language Model engine
//!
//! A supervised, multi-agent runtime that lets an LLM solve a task by
//! repeatedly writing, executing, and observing code inside a sandboxed
//! interpreter, optionally recursing into child LLM sub-calls (§1).
//!
//! [`Rlm`] is the single entry point: construct one from an [`RlmConfig`]
//! and an [`LlmAdapter`], then drive it with [`Rlm::run`] for a
//! synchronous one-shot turn, [`Rlm::run_async`] to spawn one without
//! blocking, or [`Rlm::start_session`]/[`Rlm::send_message`] for a
//! keep-alive session that carries bindings across many turns. Every Run
//! this handle creates shares one [`rlm_run::EventBus`]/[`rlm_run::EventLog`]
//! pair, so subscribing to `run_id`'s events (via [`Rlm::subscribe`]) works
//! the same way for a one-shot run or a long-lived session.

mod error;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rlm_proto::{DurationMs, Event, LlmAdapter, Message, RlmConfig, RunId, SessionId};
use rlm_run::{EventBus, EventLog, RunEventSink, RunSupervisor};
use rlm_tool::ToolCatalog;
use rlm_worker::{WorkerError, WorkerHandle, WorkerSnapshot};
use tokio::sync::broadcast;
use uuid::Uuid;

pub use error::RlmError;

/// Happy-path imports for embedding the RLM engine.
pub mod prelude {
    pub use rlm_proto::{Event, EventKind, LlmAdapter, RlmConfig};
    pub use rlm_tool::SandboxTool;

    pub use crate::{Rlm, RlmError};
}

/// The engine's single entry point (§6's "Public API").
///
/// Cheaply cloneable: everything it owns is already behind an `Arc` or a
/// lock, so handing a clone to, say, an HTTP handler task costs one
/// refcount bump.
#[derive(Clone)]
pub struct Rlm {
    inner: Arc<Inner>,
}

struct Inner {
    config: RlmConfig,
    adapter: Arc<dyn LlmAdapter>,
    tool_catalog: Arc<ToolCatalog>,
    cwd: PathBuf,
    bus: Arc<EventBus>,
    log: Arc<EventLog>,
    sessions: Mutex<HashMap<SessionId, (Arc<RunSupervisor>, WorkerHandle)>>,
}

impl Rlm {
    /// Build a handle with the built-in sandbox tool catalog (§4.5's fixed
    /// seven tools) and the current working directory as every Run's
    /// sandbox `cwd`.
    pub fn new(config: RlmConfig, adapter: Arc<dyn LlmAdapter>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_tools_and_cwd(config, adapter, Arc::new(ToolCatalog::with_builtins()), cwd)
    }

    /// Build a handle with an explicit tool catalog and sandbox working
    /// directory — the knobs a host embedding this engine (a REPL, a web
    /// dashboard backend) typically wants to control directly.
    pub fn with_tools_and_cwd(
        config: RlmConfig,
        adapter: Arc<dyn LlmAdapter>,
        tool_catalog: Arc<ToolCatalog>,
        cwd: PathBuf,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                adapter,
                tool_catalog,
                cwd,
                bus: Arc::new(EventBus::new()),
                log: Arc::new(EventLog::new()),
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to a Run's live event topic `run:<run_id>` (§4.6).
    pub fn subscribe(&self, run_id: &RunId) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe(run_id)
    }

    /// Snapshot every event recorded so far for `run_id`, in arrival order.
    pub fn event_log(&self, run_id: &RunId) -> Vec<Event> {
        self.inner.log.events(run_id)
    }

    /// Drive one synchronous one-shot turn to completion (§6's `run`).
    ///
    /// `opts`, if given, replaces the handle's default [`RlmConfig`] for
    /// this Run only — the "every field optional, caller overrides
    /// defaults" layering from §6's options table.
    #[tracing::instrument(skip_all)]
    pub async fn run(
        &self,
        context: impl Into<String>,
        query: impl Into<String>,
        opts: Option<RlmConfig>,
    ) -> Result<(serde_json::Value, RunId), RlmError> {
        let (run_id, supervisor) = self.new_run(opts);
        let answer = supervisor.run_one_shot(context.into(), query.into()).await?;
        Ok((answer, run_id))
    }

    /// Spawn one-shot turn without blocking (§6's `run_async`). The
    /// returned [`tokio::task::JoinHandle`] resolves once the turn
    /// completes, fails, or is cancelled.
    pub fn run_async(
        &self,
        context: impl Into<String>,
        query: impl Into<String>,
        opts: Option<RlmConfig>,
    ) -> (RunId, tokio::task::JoinHandle<Result<serde_json::Value, RlmError>>) {
        let (run_id, supervisor) = self.new_run(opts);
        let context = context.into();
        let query = query.into();
        let task = tokio::spawn(async move { supervisor.run_one_shot(context, query).await.map_err(RlmError::from) });
        (run_id, task)
    }

    /// Start an idle keep-alive session (§6's `start_session`). Bindings
    /// persist across every `send_message` call made against the
    /// returned id until the session is dropped via [`Rlm::end_session`].
    pub fn start_session(&self, context: impl Into<String>, opts: Option<RlmConfig>) -> SessionId {
        let (_run_id, supervisor) = self.new_run(opts);
        let (session_id, handle) = supervisor.start_session(context.into());
        self.inner.sessions.lock().unwrap().insert(session_id.clone(), (supervisor, handle));
        session_id
    }

    /// Drive one turn of a keep-alive session (§6's `send_message`).
    /// Errors with [`WorkerError::Busy`] (wrapped in [`RlmError::Worker`])
    /// if a turn is already running for this session; the in-flight turn
    /// is unaffected. `timeout`, if given, bounds how long this call waits
    /// before giving up — the turn itself keeps running regardless.
    #[tracing::instrument(skip_all, fields(session_id = %session_id))]
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        text: impl Into<String>,
        timeout: Option<DurationMs>,
    ) -> Result<serde_json::Value, RlmError> {
        let handle = self.session_handle(session_id)?;
        let turn = handle.send_message(text);
        match timeout {
            Some(d) => tokio::time::timeout(d.to_std(), turn)
                .await
                .map_err(|_| RlmError::Worker(WorkerError::Cancelled))?
                .map_err(RlmError::from),
            None => turn.await.map_err(RlmError::from),
        }
    }

    /// Snapshot a session's full message history (§6's `history`). Returns
    /// an empty history for an unknown session rather than erroring, since
    /// this is a read-only convenience, not an action with side effects.
    pub async fn history(&self, session_id: &SessionId) -> Vec<Message> {
        match self.session_handle(session_id) {
            Ok(handle) => handle.history().await,
            Err(_) => Vec::new(),
        }
    }

    /// Snapshot a session's current status (§6's `status`). `None` if the
    /// session id is unknown or the Worker has since shut down.
    pub async fn status(&self, session_id: &SessionId) -> Option<WorkerSnapshot> {
        let handle = self.session_handle(session_id).ok()?;
        handle.status().await
    }

    /// Terminate a session's Run and drop it from this handle's session
    /// table. Idempotent: ending an already-unknown session is a no-op.
    pub fn end_session(&self, session_id: &SessionId) {
        if let Some((supervisor, handle)) = self.inner.sessions.lock().unwrap().remove(session_id) {
            supervisor.terminate();
            tokio::spawn(async move { handle.shutdown().await });
        }
    }

    fn session_handle(&self, session_id: &SessionId) -> Result<WorkerHandle, RlmError> {
        self.inner
            .sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|(_, handle)| handle.clone())
            .ok_or_else(|| RlmError::UnknownSession(session_id.to_string()))
    }

    /// Allocate a fresh `RunId` and build the [`RunSupervisor`] that owns
    /// it, wired to this handle's shared adapter, tool catalog, and
    /// event bus/log.
    fn new_run(&self, opts: Option<RlmConfig>) -> (RunId, Arc<RunSupervisor>) {
        let run_id = RunId::new(Uuid::new_v4().to_string());
        let sink = Arc::new(RunEventSink::new(self.inner.bus.clone(), self.inner.log.clone()));
        let config = opts.unwrap_or_else(|| self.inner.config.clone());
        let supervisor = RunSupervisor::new(
            run_id.clone(),
            config,
            self.inner.adapter.clone(),
            self.inner.tool_catalog.clone(),
            sink,
            self.inner.cwd.clone(),
        );
        (run_id, supervisor)
    }
}
