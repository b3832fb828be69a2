//! Errors the sub-call scheduler and Run supervisor can produce (§7).

use rlm_worker::WorkerError;
use thiserror::Error;

/// Why a scheduler-level operation (admitting a sub-call, spawning a root
/// Worker) failed.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `child_depth = parent_depth + 1` exceeded `config.max_depth`.
    #[error("maximum recursion depth exceeded (depth {depth} > limit {limit})")]
    MaxDepth {
        /// The depth the child would have been spawned at.
        depth: u32,
        /// The configured cap.
        limit: u32,
    },

    /// The parent Worker's own `active_subcalls` bound was already at
    /// capacity. Normally rejected by the Worker itself before this crate
    /// is even asked to spawn anything; kept here so a scheduler-side
    /// caller (e.g. a future batched-admission path) can report the same
    /// failure uniformly.
    #[error("max concurrent sub-calls reached ({active}/{limit})")]
    MaxConcurrency {
        /// Sub-calls currently in flight.
        active: u32,
        /// The configured cap.
        limit: u32,
    },

    /// The requesting parent span is not (or is no longer) registered
    /// with this Run — it already completed, or belongs to a different
    /// Run entirely.
    #[error("unknown parent span: {0}")]
    UnknownParent(String),

    /// The spawned child Worker itself failed to produce an answer.
    #[error("child worker failed: {0}")]
    ChildFailed(String),

    /// Catch-all for errors not covered above.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<WorkerError> for SchedulerError {
    /// A spawned child's own turn failure surfaces to the parent as a
    /// `ChildFailed`, so the parent's sandboxed caller sees one uniform
    /// error shape regardless of whether the child was rejected before it
    /// ever ran or failed partway through its turn.
    fn from(err: WorkerError) -> Self {
        Self::ChildFailed(err.to_string())
    }
}

impl SchedulerError {
    /// Whether retrying the same request might succeed. Budget rejections
    /// are deterministic given the same tree shape; a child failure might
    /// have been transient (e.g. an adapter hiccup) and is worth a retry
    /// at the caller's discretion.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ChildFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_errors_are_not_retryable() {
        assert!(!SchedulerError::MaxDepth { depth: 4, limit: 3 }.is_retryable());
        assert!(!SchedulerError::MaxConcurrency { active: 4, limit: 4 }.is_retryable());
        assert!(!SchedulerError::UnknownParent("s1".into()).is_retryable());
    }

    #[test]
    fn child_failure_is_retryable() {
        assert!(SchedulerError::ChildFailed("timeout".into()).is_retryable());
    }

    #[test]
    fn a_worker_error_chains_into_child_failed() {
        let err: SchedulerError = WorkerError::Busy.into();
        assert!(matches!(err, SchedulerError::ChildFailed(msg) if msg == "worker is busy"));
    }
}
