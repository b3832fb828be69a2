//! Property: for any configured `max_depth`, a Worker that keeps recursing
//! into sub-calls always settles — the chain is rejected once it would
//! exceed the bound, rather than growing without limit or hanging (§8's
//! depth-bound and deadlock-freedom properties).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use rlm_proto::{AdapterError, ChatOptions, DurationMs, Event, EventSink, LlmAdapter, Message, RlmConfig, RunId, Usage};
use rlm_run::RunSupervisor;
use rlm_tool::ToolCatalog;

const RECURSING_SNIPPET: &str = r#"{"reasoning":"recurse","code":"async function main() {\
    const [ok, value] = await worker.lm_query('go deeper');\
    final_answer = ok ? value : String(value);\
}\
main();"}"#;

/// Always replies with a snippet that calls `lm_query` again, so the only
/// way a run ever settles is via the depth bound rejecting the deepest
/// attempt.
struct RecursingAdapter;

#[async_trait]
impl LlmAdapter for RecursingAdapter {
    async fn chat(&self, _messages: &[Message], _model: &str, _opts: ChatOptions) -> Result<(String, Usage), AdapterError> {
        Ok((RECURSING_SNIPPET.to_string(), Usage::default()))
    }
}

struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn publish(&self, _event: Event) {}
}

fn config(max_depth: u32) -> RlmConfig {
    RlmConfig {
        model_large: "large".to_string(),
        model_small: "small".to_string(),
        max_iterations: 20,
        max_depth,
        max_concurrent_subcalls: 4,
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
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn recursive_subcalls_never_exceed_the_configured_depth(max_depth in 0u32..6) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let answer = rt.block_on(async {
            let run = RunSupervisor::new(
                RunId::new("run-prop"),
                config(max_depth),
                Arc::new(RecursingAdapter),
                Arc::new(ToolCatalog::with_builtins()),
                Arc::new(NullSink),
                PathBuf::from("."),
            );

            let outcome = tokio::time::timeout(
                std::time::Duration::from_secs(10),
                run.run_one_shot("ctx".to_string(), "start".to_string()),
            )
            .await
            .expect("an unbounded-looking recursion must still settle once the depth bound rejects it");

            outcome.expect("a rejected sub-call is reported as a final answer, not a Worker crash")
        });

        let answer = answer.as_str().expect("rejection message is a string").to_string();
        prop_assert!(answer.contains("maximum recursion depth exceeded"));
        prop_assert!(answer.contains(&format!("limit {max_depth}")));
    }
}
