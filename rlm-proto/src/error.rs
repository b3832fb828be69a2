//! Error type for the LLM adapter collaborator boundary.
//!
//! Per-crate error enums (`EvalError`, `WorkerError`, `SchedulerError`,
//! `ToolError`) live in their owning crates and chain upward via `#[from]`.
//! `AdapterError` lives here because the [`crate::adapter::LlmAdapter`]
//! trait it belongs to is a protocol-level collaborator interface, not an
//! owned subsystem.

use thiserror::Error;

/// Errors from an [`crate::adapter::LlmAdapter`] implementation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The call did not complete within its configured timeout.
    #[error("llm call timed out after {0}ms")]
    Timeout(u64),

    /// The adapter's transport failed (HTTP error, connection reset, etc).
    /// The wire-format and vendor client are out of scope for this engine;
    /// adapters report transport failures through this one variant.
    #[error("llm request failed: {0}")]
    RequestFailed(String),

    /// The adapter rejected the call outright (bad credentials, unknown
    /// model, rate limit with no retry budget left).
    #[error("llm call rejected: {0}")]
    Rejected(String),

    /// Catch-all for errors not covered above.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl AdapterError {
    /// Whether retrying the same call might succeed.
    ///
    /// Timeouts and transport failures are plausibly transient; rejections
    /// and the opaque catch-all are treated as non-retryable absent more
    /// information.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::RequestFailed(_))
    }
}
