//! The eval bridge contract (§4.4): the handle an Evaluator's sandbox binds
//! its `worker` global to, so that sandboxed code can synchronously call
//! back into its own Worker without the Worker ever blocking on eval.
//!
//! A concrete implementation (rlm-worker's `WorkerHandle`) is a cheap,
//! cloneable wrapper around an mpsc sender into the Worker's own inbox:
//! every method below becomes "send a request, await the matching
//! `oneshot` reply", so a call made from inside a running eval snippet is
//! serviced as an ordinary inbox message, never a reentrant call into the
//! Worker's own stack frame.

use async_trait::async_trait;

use crate::protocol::{DirectQueryOutcome, DirectQueryRequest, SubcallOutcome, SubcallRequest, ToolOutcome, ToolRequest};

/// Everything a sandboxed snippet can call back into its Worker for.
#[async_trait]
pub trait WorkerFacing: Send + Sync {
    /// `lm_query(query, opts)` — spawn one child sub-call and await its
    /// final answer.
    async fn lm_query(&self, req: SubcallRequest) -> SubcallOutcome;

    /// `parallel_query([q1, ..., qn])` — spawn `n` independent child
    /// sub-calls concurrently and await all of them. Per-child failures are
    /// per-element `Err`s, not a whole-batch failure; the returned vector
    /// preserves input order regardless of settlement order.
    async fn parallel_query(&self, reqs: Vec<SubcallRequest>) -> Vec<SubcallOutcome>;

    /// `direct_query(query, schema, opts)` — one schema-constrained LLM
    /// call, no child Worker loop.
    async fn direct_query(&self, req: DirectQueryRequest) -> DirectQueryOutcome;

    /// Invoke one of the fixed sandbox tools (§4.5) by name.
    async fn tool_call(&self, req: ToolRequest) -> ToolOutcome;
}
