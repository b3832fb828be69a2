//! Property: for any `max_iterations` budget, a turn whose snippets never
//! set `final_answer` executes exactly that many iterations and then fails
//! the turn — never more, never a hang (§8's iteration-budget property).

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use rlm_proto::{
    AdapterError, ChatOptions, DurationMs, Event, EventSink, LlmAdapter, Message, ModelSize, ParentSpanId, RlmConfig,
    RunId, SpanId, SubcallOutcome, SubcallRequest, SubcallSpawner, Usage,
};
use rlm_tool::ToolCatalog;
use rlm_worker::{spawn, WorkerConfig, WorkerError, WorkerMode};
use tokio_util::sync::CancellationToken;

/// Counts how many times it was asked for a reply, always handing back a
/// snippet that assigns a binding but never sets `final_answer`.
struct CountingAdapter {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmAdapter for CountingAdapter {
    async fn chat(&self, _messages: &[Message], _model: &str, _opts: ChatOptions) -> Result<(String, Usage), AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((r#"{"reasoning":"thinking","code":"x = 1"}"#.to_string(), Usage::default()))
    }
}

struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn publish(&self, _event: Event) {}
}

struct RejectingSpawner;

#[async_trait]
impl SubcallSpawner for RejectingSpawner {
    async fn spawn_child(&self, _parent: SpanId, _req: SubcallRequest) -> SubcallOutcome {
        Err("no scheduler wired up in this test".to_string())
    }
}

fn config(max_iterations: u32) -> RlmConfig {
    RlmConfig {
        model_large: "large".to_string(),
        model_small: "small".to_string(),
        max_iterations,
        max_depth: 3,
        max_concurrent_subcalls: 2,
        eval_timeout: DurationMs::from_millis(2_000),
        llm_timeout: DurationMs::from_millis(2_000),
        stdout_limit_bytes: 50_000,
        binding_preview_bytes: 200,
        api_key: None,
        api_base_url: None,
        node_name: None,
        cookie: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn a_turn_that_never_sets_final_answer_stops_at_exactly_the_budget(max_iterations in 1u32..10) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let adapter = Arc::new(CountingAdapter { calls: AtomicUsize::new(0) });

        let used = {
            let adapter = adapter.clone();
            rt.block_on(async move {
                let handle = spawn(
                    SpanId::new("root"),
                    WorkerConfig {
                        run_id: RunId::new("run-prop"),
                        parent_span_id: None as ParentSpanId,
                        depth: 0,
                        mode: WorkerMode::KeepAlive,
                        context: "ctx".to_string(),
                        cwd: PathBuf::from("."),
                        config: config(max_iterations),
                        model_size: ModelSize::Large,
                        adapter,
                        tool_catalog: Arc::new(ToolCatalog::with_builtins()),
                        spawner: Arc::new(RejectingSpawner),
                        sink: Arc::new(NullSink),
                        cancel: CancellationToken::new(),
                        initial_query: None,
                        result_tx: None,
                    },
                );

                let err = tokio::time::timeout(std::time::Duration::from_secs(10), handle.send_message("go"))
                    .await
                    .expect("an exhausted budget must fail the turn, not hang")
                    .unwrap_err();

                match err {
                    WorkerError::MaxIterations { used, limit } => {
                        assert_eq!(limit, max_iterations as usize);
                        used as u32
                    }
                    other => panic!("expected MaxIterations, got {other:?}"),
                }
            })
        };

        prop_assert_eq!(used, max_iterations);
        prop_assert_eq!(adapter.calls.load(Ordering::SeqCst) as u32, max_iterations);
    }
}
