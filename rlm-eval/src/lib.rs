#![deny(missing_docs)]
//! Sandboxed snippet evaluation for the RLM engine (§4.1).
//!
//! [`Evaluator::eval`] is the only entry point: hand it an [`EvalRequest`]
//! and it returns an [`EvalOutcome`] once the snippet finishes, times
//! out, or crashes the interpreter. Every call is isolated — a fresh
//! QuickJS runtime is built and torn down per invocation, so nothing a
//! snippet does (global mutation, a thrown exception, a busy loop)
//! outlives that one call.

mod bridge;
mod error;
mod json_bridge;
mod request;
mod sandbox;

pub use error::EvalError;
pub use request::{EvalFailure, EvalOutcome, EvalRequest, EvalSuccess};
pub use sandbox::Evaluator;

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use async_trait::async_trait;
    use rlm_proto::{
        Bindings, DirectQueryOutcome, DirectQueryRequest, DurationMs, SubcallOutcome, SubcallRequest, ToolOutcome,
        ToolRequest, WorkerFacing,
    };

    use super::*;

    /// A `WorkerFacing` stub that answers every `lm_query` immediately
    /// with a canned value, used to exercise the eval bridge without a
    /// real Worker or LLM adapter.
    struct StubWorker;

    #[async_trait]
    impl WorkerFacing for StubWorker {
        async fn lm_query(&self, req: SubcallRequest) -> SubcallOutcome {
            Ok(serde_json::json!({ "echo": req.query }))
        }

        async fn parallel_query(&self, reqs: Vec<SubcallRequest>) -> Vec<SubcallOutcome> {
            reqs.into_iter().map(|r| Ok(serde_json::json!({ "echo": r.query }))).collect()
        }

        async fn direct_query(&self, req: DirectQueryRequest) -> DirectQueryOutcome {
            Ok(serde_json::json!({ "echo": req.query }))
        }

        async fn tool_call(&self, req: ToolRequest) -> ToolOutcome {
            Ok(format!("stub tool result for {}", req.name))
        }
    }

    fn request(code: &str, bindings: Bindings) -> EvalRequest {
        EvalRequest {
            code: code.to_string(),
            bindings,
            timeout: DurationMs::from_millis(2_000),
            cwd: PathBuf::from("."),
            worker: Arc::new(StubWorker),
        }
    }

    #[tokio::test]
    async fn simple_expression_produces_stdout() {
        let evaluator = Evaluator::new();
        let result = evaluator.eval(request("console.log('hello')", Bindings::new())).await;
        let success = result.expect("eval should succeed");
        assert_eq!(success.stdout, "hello\n");
    }

    #[tokio::test]
    async fn new_globals_become_bindings() {
        let evaluator = Evaluator::new();
        let result = evaluator.eval(request("x = 41 + 1;", Bindings::new())).await;
        let success = result.expect("eval should succeed");
        assert_eq!(success.bindings.get("x"), Some(&serde_json::json!(42)));
    }

    #[tokio::test]
    async fn existing_binding_is_reassignable() {
        let mut bindings = Bindings::new();
        bindings.set("count".to_string(), serde_json::json!(1));
        let evaluator = Evaluator::new();
        let result = evaluator.eval(request("count = count + 1;", bindings)).await;
        let success = result.expect("eval should succeed");
        assert_eq!(success.bindings.get("count"), Some(&serde_json::json!(2)));
    }

    #[tokio::test]
    async fn thrown_exception_rolls_back_bindings() {
        let mut bindings = Bindings::new();
        bindings.set("safe".to_string(), serde_json::json!("untouched"));
        let evaluator = Evaluator::new();
        let result = evaluator.eval(request("safe = 'mutated'; throw new Error('boom');", bindings.clone())).await;
        let failure = result.expect_err("eval should fail");
        assert_eq!(failure.bindings, bindings);
        assert!(matches!(failure.error, EvalError::Raised(ref msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn infinite_loop_is_interrupted_by_timeout() {
        let evaluator = Evaluator::new();
        let req = EvalRequest {
            timeout: DurationMs::from_millis(200),
            ..request("while (true) {}", Bindings::new())
        };
        let result = evaluator.eval(req).await;
        let failure = result.expect_err("eval should time out");
        assert!(matches!(failure.error, EvalError::Timeout(_)));
    }

    /// The deadlock-freedom regression: a snippet that calls `lm_query`
    /// synchronously from inside eval must still complete. There is
    /// nothing special in the test itself — it is the `StubWorker`'s
    /// independence from any Worker mailbox that proves the bridge does
    /// not require the caller to be free to service the request.
    #[tokio::test]
    async fn lm_query_from_within_eval_does_not_hang() {
        let evaluator = Evaluator::new();
        let code = r#"
            async function main() {
                const [ok, value] = await worker.lm_query("what is 2+2?");
                reply_ok = ok;
                reply = value;
            }
            main();
        "#;
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), evaluator.eval(request(code, Bindings::new())))
            .await
            .expect("eval must not hang");
        let success = result.expect("eval should succeed");
        assert_eq!(success.bindings.get("reply_ok"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn tool_call_round_trips_through_bridge() {
        let evaluator = Evaluator::new();
        let code = r#"
            async function main() {
                result = await worker.read_file("/whatever");
            }
            main();
        "#;
        let result = evaluator.eval(request(code, Bindings::new())).await;
        let success = result.expect("eval should succeed");
        assert_eq!(success.bindings.get("result"), Some(&serde_json::json!("stub tool result for read_file")));
    }

    struct FailingToolWorker;

    #[async_trait]
    impl WorkerFacing for FailingToolWorker {
        async fn lm_query(&self, _req: SubcallRequest) -> SubcallOutcome {
            Ok(serde_json::Value::Null)
        }

        async fn parallel_query(&self, reqs: Vec<SubcallRequest>) -> Vec<SubcallOutcome> {
            reqs.into_iter().map(|_| Ok(serde_json::Value::Null)).collect()
        }

        async fn direct_query(&self, _req: DirectQueryRequest) -> DirectQueryOutcome {
            Ok(serde_json::Value::Null)
        }

        async fn tool_call(&self, req: ToolRequest) -> ToolOutcome {
            Err(format!("no such file for {}", req.name))
        }
    }

    #[tokio::test]
    async fn tool_call_failure_surfaces_as_js_error() {
        let evaluator = Evaluator::new();
        let req = EvalRequest { worker: Arc::new(FailingToolWorker), ..request(
            r#"
            async function main() {
                try {
                    await worker.read_file("/does/not/exist");
                    caught = false;
                } catch (e) {
                    caught = true;
                }
            }
            main();
            "#,
            Bindings::new(),
        ) };
        let result = evaluator.eval(req).await;
        let success = result.expect("eval should succeed even though the tool call threw inside JS");
        assert_eq!(success.bindings.get("caught"), Some(&serde_json::json!(true)));
    }
}
