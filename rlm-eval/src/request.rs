//! Inputs and outputs of a single `Evaluator::eval` call (§4.1's contract).

use std::path::PathBuf;
use std::sync::Arc;

use rlm_proto::{Bindings, DurationMs, WorkerFacing};

use crate::error::EvalError;

/// One snippet evaluation request.
pub struct EvalRequest {
    /// The code to run.
    pub code: String,
    /// The bindings visible to the snippet at start.
    pub bindings: Bindings,
    /// How long the snippet may run before it is forcibly terminated.
    pub timeout: DurationMs,
    /// The working directory presented to sandbox tools invoked from the
    /// snippet.
    pub cwd: PathBuf,
    /// The bridge back to the owning Worker (§4.4) — `lm_query`,
    /// `parallel_query`, `direct_query`, and the tool shims all round-trip
    /// through this handle.
    pub worker: Arc<dyn WorkerFacing>,
}

/// A successful evaluation.
#[derive(Debug, Clone)]
pub struct EvalSuccess {
    /// Everything the snippet wrote to `console.log`/`print`.
    pub stdout: String,
    /// The input bindings merged with every name the snippet defined or
    /// reassigned.
    pub bindings: Bindings,
}

/// A failed evaluation. Bindings are the *original* input bindings,
/// unmodified — per §4.1, a failing snippet never partially commits its
/// writes.
#[derive(Debug, Clone)]
pub struct EvalFailure {
    /// Whatever the snippet printed before it failed.
    pub stdout: String,
    /// The formatted failure.
    pub error: EvalError,
    /// The original bindings, unchanged.
    pub bindings: Bindings,
}

/// The result of one evaluation.
pub type EvalOutcome = Result<EvalSuccess, EvalFailure>;
