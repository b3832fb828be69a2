//! The Worker state machine (§4.2): the per-session actor that owns one
//! conversation's bindings and history, and drives the think/eval loop one
//! turn at a time.
//!
//! A Worker runs entirely on its own `tokio::spawn`ed task; every outside
//! interaction — `send_message`, a sandboxed snippet's `lm_query`, a
//! settling sub-call — arrives as a [`WorkerMsg`] through the same
//! `mpsc` inbox. Nothing here ever calls `.await` on a future that could
//! itself need to reach back into this Worker: slow work (an LLM call, a
//! child sub-call, a tool call) is always spawned onto a separate task
//! that reports its outcome back through the inbox as a `*Settled`
//! message, so the main loop below never blocks waiting on something it
//! would also have to service (§4.4).

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rlm_eval::{EvalOutcome, EvalRequest, Evaluator};
use rlm_proto::{
    Bindings, DirectQueryOutcome, DirectQueryRequest, Event, EventKind, EventSink, LlmAdapter, LlmReply, Message,
    ModelSize, ParentSpanId, RlmConfig, RunId, SpanId, SubcallOutcome, SubcallRequest, SubcallSpawner, ToolOutcome,
    ToolRequest, Usage, WorkerFacing,
};
use rlm_tool::{ToolCatalog, ToolContext};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::handle::WorkerHandle;
use crate::mailbox::WorkerMsg;
use crate::prompt;
use crate::state::{WorkerMode, WorkerSnapshot, WorkerStatus};

const INBOX_CAPACITY: usize = 64;

/// Everything needed to construct a Worker, gathered in one place because
/// the constructor list is otherwise unwieldy.
pub struct WorkerConfig {
    /// The Run this Worker belongs to.
    pub run_id: RunId,
    /// This Worker's parent, if any (`None` for the Run's root Worker).
    pub parent_span_id: ParentSpanId,
    /// Sub-call nesting depth; the root Worker is depth 0.
    pub depth: u32,
    /// One-shot or keep-alive.
    pub mode: WorkerMode,
    /// Fixed instructions embedded in the one-time system message.
    pub context: String,
    /// Working directory presented to sandbox tools.
    pub cwd: PathBuf,
    /// Engine-wide budgets and model names.
    pub config: RlmConfig,
    /// Which of `config.model_large`/`config.model_small` this Worker uses.
    pub model_size: ModelSize,
    /// The LLM adapter used for both the iteration loop and direct queries.
    pub adapter: Arc<dyn LlmAdapter>,
    /// The shared, read-only tool catalog.
    pub tool_catalog: Arc<ToolCatalog>,
    /// Admits and spawns child Workers for sub-calls.
    pub spawner: Arc<dyn SubcallSpawner>,
    /// Lifecycle event sink.
    pub sink: Arc<dyn EventSink>,
    /// Cancelled to cascade-shutdown this Worker (and anything it spawns).
    pub cancel: CancellationToken,
    /// For a one-shot Worker, the query to auto-start on spawn.
    pub initial_query: Option<String>,
    /// For a one-shot Worker, where to deliver the single turn's outcome.
    pub result_tx: Option<oneshot::Sender<Result<serde_json::Value, WorkerError>>>,
}

/// Spawn a Worker onto its own task and return a handle to it.
pub fn spawn(span_id: SpanId, cfg: WorkerConfig) -> WorkerHandle {
    let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
    let model = match cfg.model_size {
        ModelSize::Large => cfg.config.model_large.clone(),
        ModelSize::Small => cfg.config.model_small.clone(),
    };
    let self_handle = WorkerHandle::new(span_id.clone(), tx.clone());
    let tool_ctx = ToolContext::new(cfg.cwd.clone());

    let worker = Worker {
        span_id,
        run_id: cfg.run_id,
        parent_span_id: cfg.parent_span_id,
        depth: cfg.depth,
        mode: cfg.mode,
        status: WorkerStatus::Idle,
        bindings: Bindings::new(),
        history: vec![prompt::system_message(&cfg.context)],
        iteration: 0,
        turn: 0,
        active_subcalls: 0,
        current_query: None,
        cwd: cfg.cwd,
        config: cfg.config,
        model,
        adapter: cfg.adapter,
        evaluator: Evaluator::new(),
        tool_catalog: cfg.tool_catalog,
        tool_ctx,
        spawner: cfg.spawner,
        sink: cfg.sink,
        self_handle,
        self_tx: tx,
        inbox: rx,
        pending_reply: None,
        turn_driver: None,
        cancel: cfg.cancel,
        initial_query: cfg.initial_query,
        result_tx: cfg.result_tx,
    };

    let handle = worker.self_handle.clone();
    tokio::spawn(worker.run());
    handle
}

type TurnDriver = Pin<Box<dyn Future<Output = Result<IterationRaw, WorkerError>> + Send>>;

/// The per-session actor. Lives entirely inside its own `tokio::spawn`ed
/// task; every field here is private to that task, so nothing needs a
/// lock (§5).
struct Worker {
    span_id: SpanId,
    run_id: RunId,
    parent_span_id: ParentSpanId,
    depth: u32,
    mode: WorkerMode,
    status: WorkerStatus,
    bindings: Bindings,
    history: Vec<Message>,
    iteration: u32,
    turn: usize,
    active_subcalls: u32,
    current_query: Option<String>,
    cwd: PathBuf,
    config: RlmConfig,
    model: String,
    adapter: Arc<dyn LlmAdapter>,
    evaluator: Evaluator,
    tool_catalog: Arc<ToolCatalog>,
    tool_ctx: ToolContext,
    spawner: Arc<dyn SubcallSpawner>,
    sink: Arc<dyn EventSink>,
    self_handle: WorkerHandle,
    self_tx: mpsc::Sender<WorkerMsg>,
    inbox: mpsc::Receiver<WorkerMsg>,
    pending_reply: Option<oneshot::Sender<Result<serde_json::Value, WorkerError>>>,
    turn_driver: Option<TurnDriver>,
    cancel: CancellationToken,
    initial_query: Option<String>,
    result_tx: Option<oneshot::Sender<Result<serde_json::Value, WorkerError>>>,
}

/// The raw outcome of one think/eval iteration, before the transition
/// table in [`Worker::apply_iteration`] interprets it.
struct IterationRaw {
    reasoning: String,
    code: String,
    usage: Usage,
    eval: EvalOutcome,
}

impl Worker {
    #[tracing::instrument(skip_all, fields(span_id = %self.span_id, depth = self.depth))]
    async fn run(mut self) {
        self.emit(EventKind::NodeStart, serde_json::json!({ "depth": self.depth }));

        if let Some(query) = self.initial_query.take() {
            let reply = self.result_tx.take();
            self.pending_reply = reply;
            self.begin_turn(query);
        }

        loop {
            if self.status == WorkerStatus::Complete {
                break;
            }
            let has_driver = self.turn_driver.is_some();
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.finish_turn(Err(WorkerError::Cancelled));
                    break;
                }
                maybe_msg = self.inbox.recv() => {
                    match maybe_msg {
                        Some(msg) => self.handle_message(msg).await,
                        None => break,
                    }
                }
                result = poll_driver(&mut self.turn_driver), if has_driver => {
                    self.apply_iteration(result).await;
                }
            }
        }

        self.emit(EventKind::NodeStop, serde_json::json!({}));
    }

    async fn handle_message(&mut self, msg: WorkerMsg) {
        match msg {
            WorkerMsg::SendMessage { text, reply } => {
                if self.status == WorkerStatus::Running {
                    let _ = reply.send(Err(WorkerError::Busy));
                    return;
                }
                self.pending_reply = Some(reply);
                self.begin_turn(text);
            }
            WorkerMsg::History { reply } => {
                let _ = reply.send(self.history.clone());
            }
            WorkerMsg::Status { reply } => {
                let _ = reply.send(self.snapshot());
            }
            WorkerMsg::Shutdown => {
                self.status = WorkerStatus::Complete;
            }
            WorkerMsg::SpawnSubcall { req, reply } => self.handle_spawn_subcall(req, reply),
            WorkerMsg::SubcallSettled { reply, outcome } => {
                self.active_subcalls = self.active_subcalls.saturating_sub(1);
                self.emit(EventKind::SubcallResult, serde_json::json!({ "ok": outcome.is_ok() }));
                let _ = reply.send(outcome);
            }
            WorkerMsg::ParallelSubcall { reqs, reply } => self.handle_parallel_subcall(reqs, reply),
            WorkerMsg::ParallelSettled { reply, mut partial, settled, admitted_count } => {
                self.active_subcalls = self.active_subcalls.saturating_sub(admitted_count as u32);
                for (idx, outcome) in settled {
                    partial[idx] = Some(outcome);
                }
                let result: Vec<SubcallOutcome> = partial
                    .into_iter()
                    .map(|o| o.unwrap_or_else(|| Err("internal error: sub-call result missing".to_string())))
                    .collect();
                let _ = reply.send(result);
            }
            WorkerMsg::DirectQuery { req, reply } => self.handle_direct_query(req, reply),
            WorkerMsg::DirectQuerySettled { reply, outcome } => {
                self.emit(EventKind::DirectQueryStop, serde_json::json!({ "ok": outcome.is_ok() }));
                let _ = reply.send(outcome);
            }
            WorkerMsg::ToolCall { req, reply } => self.handle_tool_call(req, reply),
            WorkerMsg::ToolCallSettled { reply, outcome } => {
                let _ = reply.send(outcome);
            }
        }
    }

    fn handle_spawn_subcall(&mut self, req: SubcallRequest, reply: oneshot::Sender<SubcallOutcome>) {
        if self.active_subcalls >= self.config.max_concurrent_subcalls {
            let _ = reply.send(Err(format!(
                "max concurrent sub-calls reached ({}/{})",
                self.active_subcalls, self.config.max_concurrent_subcalls
            )));
            return;
        }
        self.active_subcalls += 1;
        self.emit(EventKind::SubcallSpawn, serde_json::json!({ "query": req.query }));

        let spawner = self.spawner.clone();
        let parent = self.span_id.clone();
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            let outcome = spawner.spawn_child(parent, req).await;
            let _ = tx.send(WorkerMsg::SubcallSettled { reply, outcome }).await;
        });
    }

    fn handle_parallel_subcall(&mut self, reqs: Vec<SubcallRequest>, reply: oneshot::Sender<Vec<SubcallOutcome>>) {
        let mut partial: Vec<Option<SubcallOutcome>> = Vec::with_capacity(reqs.len());
        let mut admitted: Vec<(usize, SubcallRequest)> = Vec::new();

        for (idx, req) in reqs.into_iter().enumerate() {
            if self.active_subcalls >= self.config.max_concurrent_subcalls {
                partial.push(Some(Err(format!(
                    "max concurrent sub-calls reached ({}/{})",
                    self.active_subcalls, self.config.max_concurrent_subcalls
                ))));
            } else {
                self.active_subcalls += 1;
                partial.push(None);
                admitted.push((idx, req));
            }
        }

        let admitted_count = admitted.len();
        if admitted_count == 0 {
            let result: Vec<SubcallOutcome> = partial.into_iter().map(|o| o.unwrap()).collect();
            let _ = reply.send(result);
            return;
        }

        self.emit(EventKind::SubcallSpawn, serde_json::json!({ "parallel": admitted_count }));

        let spawner = self.spawner.clone();
        let parent = self.span_id.clone();
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            let settled: Vec<(usize, SubcallOutcome)> = futures::future::join_all(admitted.into_iter().map(
                |(idx, req)| {
                    let spawner = spawner.clone();
                    let parent = parent.clone();
                    async move { (idx, spawner.spawn_child(parent, req).await) }
                },
            ))
            .await;

            let _ = tx
                .send(WorkerMsg::ParallelSettled { reply, partial, settled, admitted_count })
                .await;
        });
    }

    fn handle_direct_query(&mut self, req: DirectQueryRequest, reply: oneshot::Sender<DirectQueryOutcome>) {
        self.emit(EventKind::DirectQueryStart, serde_json::json!({ "query": req.query }));

        let adapter = self.adapter.clone();
        let model = match req.model_size {
            ModelSize::Large => self.config.model_large.clone(),
            ModelSize::Small => self.config.model_small.clone(),
        };
        let llm_timeout = self.config.llm_timeout;
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            let outcome = run_direct_query(adapter, model, req, llm_timeout).await;
            let _ = tx.send(WorkerMsg::DirectQuerySettled { reply, outcome }).await;
        });
    }

    fn handle_tool_call(&mut self, req: ToolRequest, reply: oneshot::Sender<ToolOutcome>) {
        let catalog = self.tool_catalog.clone();
        let ctx = self.tool_ctx.clone();
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            let outcome = catalog.call(&req.name, req.input, &ctx).await.map_err(|e| e.to_string());
            let _ = tx.send(WorkerMsg::ToolCallSettled { reply, outcome }).await;
        });
    }

    /// Start a turn: reset per-turn counters, append the turn-starting
    /// environment message (which doubles as the "append user msg" step
    /// of §4.2's transition table — its rendered text already ends with
    /// the original query, so there is no separate raw query message),
    /// and kick off the first iteration.
    fn begin_turn(&mut self, query: String) {
        self.status = WorkerStatus::Running;
        self.iteration = 0;
        self.bindings.clear_final_answer();
        self.current_query = Some(query.clone());

        let env_msg = prompt::environment_message(
            &self.bindings,
            "",
            None,
            &query,
            self.config.binding_preview_bytes,
            self.config.stdout_limit_bytes,
        );
        self.history.push(env_msg);
        self.start_next_iteration();
    }

    fn start_next_iteration(&mut self) {
        let messages = self.history.clone();

        let worker_facing: Arc<dyn WorkerFacing> = Arc::new(self.self_handle.clone());
        let fut = run_iteration(
            self.adapter.clone(),
            self.model.clone(),
            messages,
            self.config.llm_timeout,
            self.evaluator,
            self.bindings.clone(),
            self.config.eval_timeout,
            self.cwd.clone(),
            worker_facing,
        );
        self.turn_driver = Some(Box::pin(fut));
    }

    async fn apply_iteration(&mut self, result: Result<IterationRaw, WorkerError>) {
        self.turn_driver = None;

        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                self.finish_turn(Err(err));
                return;
            }
        };

        self.history
            .push(Message::assistant(format!("{}\n```js\n{}\n```", raw.reasoning, raw.code)));
        self.emit(
            EventKind::IterationStop,
            serde_json::json!({ "iteration": self.iteration, "ok": raw.eval.is_ok(), "usage": raw.usage }),
        );

        match raw.eval {
            Ok(success) => {
                self.bindings = success.bindings;
                if self.bindings.has_final_answer() {
                    let answer = self.bindings.final_answer().cloned().unwrap_or(serde_json::Value::Null);
                    self.finish_turn(Ok(answer));
                    return;
                }
                if !self.advance_iteration_or_fail() {
                    return;
                }
                let query = self.current_query.clone().unwrap_or_default();
                let env_msg = prompt::environment_message(
                    &self.bindings,
                    &success.stdout,
                    None,
                    &query,
                    self.config.binding_preview_bytes,
                    self.config.stdout_limit_bytes,
                );
                self.history.push(env_msg);
                self.start_next_iteration();
            }
            Err(failure) => {
                self.bindings = failure.bindings;
                let error_text = failure.error.to_string();
                if !self.advance_iteration_or_fail() {
                    return;
                }
                let query = self.current_query.clone().unwrap_or_default();
                let env_msg = prompt::environment_message(
                    &self.bindings,
                    "",
                    Some(&error_text),
                    &query,
                    self.config.binding_preview_bytes,
                    self.config.stdout_limit_bytes,
                );
                self.history.push(env_msg);
                self.start_next_iteration();
            }
        }
    }

    /// Bump the iteration counter and fail the turn if the budget is now
    /// exhausted. Returns `false` if the turn was just finished (the
    /// caller must not continue building the next iteration).
    fn advance_iteration_or_fail(&mut self) -> bool {
        self.iteration += 1;
        if self.iteration >= self.config.max_iterations {
            self.finish_turn(Err(WorkerError::MaxIterations {
                used: self.iteration as usize,
                limit: self.config.max_iterations as usize,
            }));
            return false;
        }
        true
    }

    fn finish_turn(&mut self, result: Result<serde_json::Value, WorkerError>) {
        self.turn_driver = None;
        self.turn += 1;
        self.emit(
            EventKind::TurnComplete,
            serde_json::json!({ "turn": self.turn, "ok": result.is_ok() }),
        );
        if let Some(reply) = self.pending_reply.take() {
            let _ = reply.send(result);
        }
        self.status = match self.mode {
            WorkerMode::OneShot => WorkerStatus::Complete,
            WorkerMode::KeepAlive => WorkerStatus::Idle,
        };
    }

    fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot { status: self.status, iteration: self.iteration as usize, turn: self.turn }
    }

    fn emit(&self, kind: EventKind, payload: serde_json::Value) {
        let event = Event::new(self.run_id.clone(), self.span_id.clone(), self.parent_span_id.clone(), kind, now_us(), payload);
        let sink = self.sink.clone();
        tokio::spawn(async move { sink.publish(event).await });
    }
}

/// Poll the optional turn-driver future, awaiting it if present. Exists
/// so the `select!` branch above can use `tokio::select!`'s `if has_driver`
/// guard without fighting `Option::as_mut`'s borrow inside the macro.
async fn poll_driver(driver: &mut Option<TurnDriver>) -> Result<IterationRaw, WorkerError> {
    match driver {
        Some(fut) => fut.as_mut().await,
        None => std::future::pending().await,
    }
}

/// One think/eval iteration: an LLM call followed by a sandboxed eval of
/// the code it returned. Free function (not a `Worker` method) so the
/// future it returns borrows nothing from `&self` and can be held across
/// `.await` points inside the `select!` loop without fighting the
/// borrow checker (§4.2, §4.4).
#[tracing::instrument(skip_all, fields(model = %model))]
async fn run_iteration(
    adapter: Arc<dyn LlmAdapter>,
    model: String,
    messages: Vec<Message>,
    llm_timeout: rlm_proto::DurationMs,
    evaluator: Evaluator,
    bindings: Bindings,
    eval_timeout: rlm_proto::DurationMs,
    cwd: PathBuf,
    worker: Arc<dyn WorkerFacing>,
) -> Result<IterationRaw, WorkerError> {
    let opts = rlm_proto::ChatOptions { timeout: Some(llm_timeout) };
    let (raw_reply, usage) = adapter.chat(&messages, &model, opts).await?;
    let reply = LlmReply::parse(&raw_reply);

    let eval = evaluator
        .eval(EvalRequest { code: reply.code.clone(), bindings, timeout: eval_timeout, cwd, worker })
        .await;

    Ok(IterationRaw { reasoning: reply.reasoning, code: reply.code, usage, eval })
}

async fn run_direct_query(
    adapter: Arc<dyn LlmAdapter>,
    model: String,
    req: DirectQueryRequest,
    llm_timeout: rlm_proto::DurationMs,
) -> DirectQueryOutcome {
    let prompt = format!(
        "{}\n\nRespond with a single JSON object conforming to this schema:\n{}",
        req.query,
        serde_json::to_string_pretty(&req.schema).unwrap_or_default()
    );
    let messages = vec![Message::user(prompt)];
    let opts = rlm_proto::ChatOptions { timeout: Some(llm_timeout) };
    let (raw, _usage) = adapter.chat(&messages, &model, opts).await.map_err(|e| e.to_string())?;
    serde_json::from_str(&raw).map_err(|e| format!("direct_query reply was not valid JSON: {e}"))
}

fn now_us() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_micros() as u64).unwrap_or(0)
}
