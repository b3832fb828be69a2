//! Errors a Worker's turn can end in (§7).

use rlm_proto::AdapterError;
use thiserror::Error;

/// Why a turn (`run`/`send_message`) failed to produce an answer.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The turn used `used` iterations against a `limit` of `limit`
    /// without the snippet ever setting `final_answer`.
    #[error("maximum iterations exceeded ({used}/{limit})")]
    MaxIterations {
        /// Iterations actually run.
        used: usize,
        /// The configured cap.
        limit: usize,
    },

    /// A `send_message` arrived while a turn was already running.
    #[error("worker is busy")]
    Busy,

    /// The LLM adapter returned an error; per §7 this aborts the turn
    /// rather than being retried locally.
    #[error("llm adapter failed: {0}")]
    AdapterFailed(#[from] AdapterError),

    /// The turn was cancelled (Run shutdown, or an explicit caller
    /// timeout) before it produced an answer.
    #[error("cancelled")]
    Cancelled,

    /// Any other failure not covered by a named variant above.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl WorkerError {
    /// Whether retrying the same turn might succeed. A budget exhaustion
    /// or a busy rejection will not resolve itself by retrying
    /// immediately; a transient adapter failure might.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AdapterFailed(e) => e.is_retryable(),
            Self::MaxIterations { .. } | Self::Busy | Self::Cancelled => false,
            Self::Other(_) => false,
        }
    }
}
