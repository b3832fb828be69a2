//! Wire shapes for requests that cross the eval bridge: a sandboxed
//! snippet calling `lm_query`, `parallel_query`, `direct_query`, or one of
//! the filesystem/shell tool shims, all routed through
//! [`crate::worker_facing::WorkerFacing`].

use serde::{Deserialize, Serialize};

use crate::adapter::ModelSize;

/// A request to spawn (or count toward) a child sub-call, originating from
/// `lm_query`/`parallel_query` inside a sandboxed snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcallRequest {
    /// The sub-query text.
    pub query: String,
    /// Which configured model the child Worker's turn should use.
    pub model_size: ModelSize,
    /// Optional JSON Schema constraining the child's final answer. Not
    /// currently enforced on the free-form `lm_query` path — reserved for
    /// parity with `direct_query`'s schema-constrained contract.
    pub schema: Option<serde_json::Value>,
    /// Overrides the child Worker's `context`; defaults to the parent's
    /// context when absent.
    pub context: Option<String>,
}

impl SubcallRequest {
    /// Construct a request with the default (large) model and no schema
    /// or context override — the common `lm_query("...")` shape.
    pub fn simple(query: impl Into<String>) -> Self {
        Self { query: query.into(), model_size: ModelSize::Large, schema: None, context: None }
    }
}

/// The result of a sub-call, as returned to the sandboxed caller.
///
/// Mirrors the `(ok, value)` / `(error, reason)` tuple contract in §4.3:
/// represented as an idiomatic `Result` on the Rust side and converted to a
/// two-element JS array at the sandbox boundary.
pub type SubcallOutcome = Result<serde_json::Value, String>;

/// A schema-constrained direct query: one LLM call, no child Worker loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectQueryRequest {
    /// The query text.
    pub query: String,
    /// JSON Schema the reply must conform to.
    pub schema: serde_json::Value,
    /// Which configured model to call.
    pub model_size: ModelSize,
    /// Overrides the caller's context for this one call.
    pub context: Option<String>,
}

/// The result of a direct query: the parsed JSON object, or an error
/// string describing why parsing or the call itself failed.
pub type DirectQueryOutcome = Result<serde_json::Value, String>;

/// A request to invoke one of the fixed sandbox tools (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// The tool's registered name, e.g. `"read_file"`.
    pub name: String,
    /// The tool's input, shaped per that tool's schema.
    pub input: serde_json::Value,
}

/// A tool's `(ok string | error string)` result.
pub type ToolOutcome = Result<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_subcall_defaults_to_large_model() {
        let req = SubcallRequest::simple("what is 2+2");
        assert_eq!(req.model_size, ModelSize::Large);
        assert!(req.schema.is_none());
        assert!(req.context.is_none());
    }
}
