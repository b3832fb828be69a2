//! The Run supervisor (§2, §3): owns one root task, creates the Workers
//! belonging to it, and cascade-terminates all of them on shutdown.
//!
//! Per §9's "recursion in supervised trees" design note, child Workers
//! spawned for sub-calls are siblings of the parent under the same
//! [`RunSupervisor`], not nested supervisors — cascade shutdown stays a
//! single `CancellationToken::cancel()` regardless of how deep a
//! sub-call tree grows.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rlm_proto::{
    Event, EventSink, LlmAdapter, ModelSize, RlmConfig, RunId, SessionId, SpanId, SubcallOutcome, SubcallRequest,
    SubcallSpawner,
};
use rlm_tool::ToolCatalog;
use rlm_worker::{WorkerConfig, WorkerError, WorkerHandle, WorkerMode};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;

/// Bookkeeping kept per live Worker so an admitted sub-call can resolve
/// `child_depth` and the context a child defaults to when it doesn't
/// supply its own.
struct Registration {
    depth: u32,
    context: String,
}

/// Owns everything scoped to one end-to-end invocation: the root Worker,
/// every descendant spawned from it, and the cancellation handle that
/// tears the whole tree down at once.
pub struct RunSupervisor {
    run_id: RunId,
    config: RlmConfig,
    adapter: Arc<dyn LlmAdapter>,
    tool_catalog: Arc<ToolCatalog>,
    sink: Arc<dyn EventSink>,
    cwd: PathBuf,
    cancel: CancellationToken,
    registry: Mutex<HashMap<SpanId, Registration>>,
    next_span: AtomicU64,
}

impl RunSupervisor {
    /// Create a new Run. `cwd` is the working directory presented to
    /// sandbox tools for every Worker this Run spawns.
    pub fn new(
        run_id: RunId,
        config: RlmConfig,
        adapter: Arc<dyn LlmAdapter>,
        tool_catalog: Arc<ToolCatalog>,
        sink: Arc<dyn EventSink>,
        cwd: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            run_id,
            config,
            adapter,
            tool_catalog,
            sink,
            cwd,
            cancel: CancellationToken::new(),
            registry: Mutex::new(HashMap::new()),
            next_span: AtomicU64::new(0),
        })
    }

    /// This Run's id.
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Terminate this Run: cancels every Worker and Evaluator descending
    /// from it. Per §5, no orphaned child Workers may remain once this
    /// returns — cascading is structural (every Worker's own token is a
    /// child of `self.cancel`), not a traversal this method has to do.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }

    /// Drive one synchronous one-shot turn end to end: spawns a root
    /// Worker at depth 0, auto-starts it with `query`, and awaits its
    /// final answer (§6's `run`).
    pub async fn run_one_shot(
        self: &Arc<Self>,
        context: String,
        query: String,
    ) -> Result<serde_json::Value, WorkerError> {
        let span_id = self.alloc_span_id();
        self.register(span_id.clone(), 0, context.clone());

        let (result_tx, result_rx) = oneshot::channel();
        let cfg = self.worker_config(None, 0, WorkerMode::OneShot, ModelSize::Large, context, Some(query), Some(result_tx));
        let _handle = rlm_worker::spawn(span_id.clone(), cfg);

        let outcome = result_rx.await.unwrap_or(Err(WorkerError::Cancelled));
        self.unregister(&span_id);
        outcome
    }

    /// Start an idle keep-alive Worker (§6's `start_session`). Returns
    /// the session id (the Worker's own span id, reused as a `SessionId`
    /// for the external-facing API) and a handle to drive turns with.
    pub fn start_session(self: &Arc<Self>, context: String) -> (SessionId, WorkerHandle) {
        let span_id = self.alloc_span_id();
        self.register(span_id.clone(), 0, context.clone());

        let cfg = self.worker_config(None, 0, WorkerMode::KeepAlive, ModelSize::Large, context, None, None);
        let handle = rlm_worker::spawn(span_id.clone(), cfg);
        (SessionId::new(span_id.as_str()), handle)
    }

    fn alloc_span_id(&self) -> SpanId {
        let n = self.next_span.fetch_add(1, Ordering::Relaxed);
        SpanId::new(format!("{}-{n}", self.run_id))
    }

    fn register(&self, span_id: SpanId, depth: u32, context: String) {
        self.registry.lock().unwrap().insert(span_id, Registration { depth, context });
    }

    fn unregister(&self, span_id: &SpanId) {
        self.registry.lock().unwrap().remove(span_id);
    }

    fn lookup(&self, span_id: &SpanId) -> Option<(u32, String)> {
        self.registry.lock().unwrap().get(span_id).map(|r| (r.depth, r.context.clone()))
    }

    #[allow(clippy::too_many_arguments)]
    fn worker_config(
        self: &Arc<Self>,
        parent_span_id: Option<SpanId>,
        depth: u32,
        mode: WorkerMode,
        model_size: ModelSize,
        context: String,
        initial_query: Option<String>,
        result_tx: Option<oneshot::Sender<Result<serde_json::Value, WorkerError>>>,
    ) -> WorkerConfig {
        let scheduler: Arc<dyn SubcallSpawner> = Arc::new(RunScheduler(self.clone()));
        WorkerConfig {
            run_id: self.run_id.clone(),
            parent_span_id,
            depth,
            mode,
            context,
            cwd: self.cwd.clone(),
            config: self.config.clone(),
            model_size,
            adapter: self.adapter.clone(),
            tool_catalog: self.tool_catalog.clone(),
            spawner: scheduler,
            sink: self.sink.clone(),
            cancel: self.cancel.child_token(),
            initial_query,
            result_tx,
        }
    }

}

/// Cheap, cloneable delegate that implements [`SubcallSpawner`] by asking
/// its [`RunSupervisor`] to admit and spawn a child Worker.
///
/// Kept as a thin wrapper (rather than implementing the trait on
/// `RunSupervisor` itself) so every Worker's `spawner` field is an
/// independent `Arc<dyn SubcallSpawner>` clone of the same underlying
/// supervisor — no self-referential `Arc` required.
struct RunScheduler(Arc<RunSupervisor>);

#[async_trait]
impl SubcallSpawner for RunScheduler {
    async fn spawn_child(&self, parent: SpanId, req: SubcallRequest) -> SubcallOutcome {
        let supervisor = &self.0;

        let (parent_depth, parent_context) =
            supervisor.lookup(&parent).ok_or_else(|| SchedulerError::UnknownParent(parent.to_string()).to_string())?;

        let child_depth = parent_depth + 1;
        if child_depth > supervisor.config.max_depth {
            return Err(SchedulerError::MaxDepth { depth: child_depth, limit: supervisor.config.max_depth }.to_string());
        }

        let span_id = supervisor.alloc_span_id();
        let context = req.context.unwrap_or(parent_context);
        supervisor.register(span_id.clone(), child_depth, context.clone());

        let (result_tx, result_rx) = oneshot::channel();
        let cfg = supervisor.worker_config(
            Some(parent.clone()),
            child_depth,
            WorkerMode::OneShot,
            req.model_size,
            context,
            Some(req.query),
            Some(result_tx),
        );
        let _handle = rlm_worker::spawn(span_id.clone(), cfg);

        let outcome = result_rx.await.unwrap_or(Err(WorkerError::Cancelled));
        supervisor.unregister(&span_id);

        outcome.map_err(|e| SchedulerError::from(e).to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use rlm_proto::{AdapterError, ChatOptions, DurationMs, Message, Usage};

    use super::*;

    struct ScriptedAdapter {
        replies: StdMutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedAdapter {
        fn new(replies: Vec<&str>) -> Self {
            Self { replies: StdMutex::new(replies.into_iter().map(str::to_string).collect()), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl LlmAdapter for ScriptedAdapter {
        async fn chat(&self, _messages: &[Message], _model: &str, _opts: ChatOptions) -> Result<(String, Usage), AdapterError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            let next = if replies.len() > 1 { replies.remove(0) } else { replies[0].clone() };
            Ok((next, Usage::default()))
        }
    }

    struct NullSink;

    #[async_trait]
    impl EventSink for NullSink {
        async fn publish(&self, _event: Event) {}
    }

    fn test_config(max_depth: u32, max_concurrent_subcalls: u32) -> RlmConfig {
        RlmConfig {
            model_large: "large".to_string(),
            model_small: "small".to_string(),
            max_iterations: 20,
            max_depth,
            max_concurrent_subcalls,
            eval_timeout: DurationMs::from_millis(5_000),
            llm_timeout: DurationMs::from_millis(5_000),
            stdout_limit_bytes: 50_000,
            binding_preview_bytes: 200,
            api_key: None,
            api_base_url: None,
            node_name: None,
            cookie: None,
        }
    }

    fn supervisor(adapter: Arc<dyn LlmAdapter>, max_depth: u32, max_concurrent_subcalls: u32) -> Arc<RunSupervisor> {
        RunSupervisor::new(
            RunId::new("run-test"),
            test_config(max_depth, max_concurrent_subcalls),
            adapter,
            Arc::new(ToolCatalog::with_builtins()),
            Arc::new(NullSink),
            PathBuf::from("."),
        )
    }

    #[tokio::test]
    async fn one_shot_run_produces_final_answer() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![r#"{"reasoning":"done","code":"final_answer = 11"}"#]));
        let run = supervisor(adapter, 3, 4);

        let answer = run.run_one_shot("Hello World".to_string(), "count characters".to_string()).await.unwrap();
        assert_eq!(answer, serde_json::json!(11));
    }

    #[tokio::test]
    async fn sub_call_beyond_max_depth_is_rejected_not_hung() {
        let reply = serde_json::json!({
            "reasoning": "try recursing",
            "code": "async function main() {\
                const [ok, value] = await worker.lm_query('anything');\
                final_answer = ok ? value : String(value);\
            }\
            main();"
        })
        .to_string();
        let adapter = Arc::new(ScriptedAdapter::new(vec![reply.as_str()]));
        let run = supervisor(adapter, 0, 4);

        let outcome =
            tokio::time::timeout(std::time::Duration::from_secs(5), run.run_one_shot("ctx".to_string(), "go".to_string()))
                .await
                .expect("turn should settle, not hang");
        let answer = outcome.unwrap();
        assert_eq!(answer, serde_json::json!("maximum recursion depth exceeded (depth 1 > limit 0)"));
    }

    #[tokio::test]
    async fn parallel_sub_calls_all_settle_and_count_toward_final_answer() {
        let reply = serde_json::json!({
            "reasoning": "fan out",
            "code": "async function main() {\
                const results = await worker.parallel_query(['q1', 'q2', 'q3']);\
                final_answer = results.length;\
            }\
            main();"
        })
        .to_string();
        let adapter = Arc::new(ScriptedAdapter::new(vec![reply.as_str()]));
        let run = supervisor(adapter, 3, 3);

        let outcome =
            tokio::time::timeout(std::time::Duration::from_secs(5), run.run_one_shot("ctx".to_string(), "go".to_string()))
                .await
                .expect("parallel sub-calls should not deadlock")
                .unwrap();
        assert_eq!(outcome, serde_json::json!(3));
    }

    #[tokio::test]
    async fn terminate_cancels_the_running_turn() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![r#"{"reasoning":"thinking","code":"x = 1"}"#]));
        let run = supervisor(adapter, 3, 4);

        let run_for_turn = run.clone();
        let turn = tokio::spawn(async move { run_for_turn.run_one_shot("ctx".to_string(), "never finishes".to_string()).await });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        run.terminate();

        let result = tokio::time::timeout(std::time::Duration::from_secs(2), turn)
            .await
            .expect("cancellation should settle the turn promptly")
            .unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn keep_alive_session_persists_bindings_across_turns() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![
            r#"{"reasoning":"set","code":"counter = 1; final_answer = counter"}"#,
        ]));
        let run = supervisor(adapter.clone(), 3, 4);

        let (_session_id, handle) = run.start_session("ctx".to_string());
        let first = handle.send_message("first turn").await.unwrap();
        assert_eq!(first, serde_json::json!(1));

        {
            let mut replies = adapter.replies.lock().unwrap();
            replies.clear();
            replies.push(r#"{"reasoning":"reuse","code":"final_answer = counter + 1"}"#.to_string());
        }

        let second = handle.send_message("second turn").await.unwrap();
        assert_eq!(second, serde_json::json!(2));
    }
}
