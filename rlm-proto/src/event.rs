//! Event bus payloads — the structured lifecycle events every significant
//! transition emits, fanned out to `run:<run_id>` subscribers and appended
//! to the per-run event log.

use serde::{Deserialize, Serialize};

use crate::id::{ParentSpanId, RunId, SpanId};

/// The kind of lifecycle transition an [`Event`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A Worker started (Run created, or a turn began).
    NodeStart,
    /// A Worker stopped (turn completed, failed, or the Worker shut down).
    NodeStop,
    /// One think/eval iteration completed.
    IterationStop,
    /// A child sub-call was admitted and a child Worker spawned.
    SubcallSpawn,
    /// A child sub-call settled (success or failure).
    SubcallResult,
    /// A schema-constrained direct query began.
    DirectQueryStart,
    /// A schema-constrained direct query settled.
    DirectQueryStop,
    /// A turn completed with a final answer.
    TurnComplete,
}

/// One structured lifecycle event.
///
/// Payloads carry head-truncated previews of results, never full values —
/// the event log is for observability, not for reconstructing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The Run this event belongs to.
    pub run_id: RunId,
    /// The Worker (span) that emitted this event.
    pub span_id: SpanId,
    /// The emitting Worker's parent, if any.
    pub parent_span_id: ParentSpanId,
    /// What kind of transition this is.
    pub kind: EventKind,
    /// Microseconds since the Unix epoch, supplied by the caller (the
    /// library never reads the system clock itself so that event
    /// construction stays deterministic and testable).
    pub timestamp_us: u64,
    /// Kind-specific payload, e.g. `{"iteration": 2, "stdout_preview": "..."}`.
    pub payload: serde_json::Value,
}

impl Event {
    /// Construct an event with the given kind and payload.
    pub fn new(
        run_id: RunId,
        span_id: SpanId,
        parent_span_id: ParentSpanId,
        kind: EventKind,
        timestamp_us: u64,
        payload: serde_json::Value,
    ) -> Self {
        Self { run_id, span_id, parent_span_id, kind, timestamp_us, payload }
    }

    /// The topic this event is published on.
    pub fn topic(&self) -> String {
        format!("run:{}", self.run_id)
    }
}
