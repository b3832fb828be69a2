//! The single error type a caller of the [`crate::Rlm`] handle sees (§7).

use rlm_worker::WorkerError;
use thiserror::Error;

/// Why a call against an [`crate::Rlm`] handle failed.
///
/// Chains the lower crates' error enums upward so a caller sees one type
/// regardless of which budget, subsystem, or session lookup failed — a
/// wrapped `WorkerError` still carries enough structure via
/// `is_retryable` and `Display` to report which one was hit. Sub-call
/// rejections (`SchedulerError`) never reach this type directly: they
/// are consumed inside the sandbox as `(ok, value)` tuples per §4.3, not
/// propagated as Rust errors past the Worker boundary.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum RlmError {
    /// The root or a descendant Worker's turn failed.
    #[error("worker failed: {0}")]
    Worker(#[from] WorkerError),

    /// `send_message`/`history`/`status` named a session id this handle
    /// never started, or one that has since been dropped.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Catch-all for errors not covered above.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl RlmError {
    /// Whether retrying the same call might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Worker(e) => e.is_retryable(),
            Self::UnknownSession(_) | Self::Other(_) => false,
        }
    }
}
