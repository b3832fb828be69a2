//! Errors from a single Evaluator invocation (§4.1, §7).

use thiserror::Error;

/// Why a single `Evaluator::eval` call failed.
///
/// Every variant preserves enough detail to feed back into the next
/// iteration's environment message (§7's "Eval failure" handling): the
/// formatted trace becomes the next prompt's failure context, and the
/// Worker rolls bindings back to their pre-snippet state.
#[non_exhaustive]
#[derive(Debug, Error, Clone)]
pub enum EvalError {
    /// The snippet raised an uncaught JS exception.
    #[error("{0}")]
    Raised(String),

    /// The snippet did not finish within its configured timeout.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// The execution context died abnormally (QuickJS runtime
    /// construction failed, or the snippet exhausted an interpreter
    /// resource limit so severely the context could not be torn down
    /// cleanly).
    #[error("eval process crashed: {0}")]
    Crashed(String),
}

impl EvalError {
    /// Whether retrying the same snippet might succeed. Timeouts are the
    /// only variant plausibly transient (e.g. a loaded machine); a raised
    /// exception or a crash will recur deterministically on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
