//! The per-run append-only event log (§3, §4.6).
//!
//! Best-effort and in-process only — the explicit non-goal on persistence
//! durability means this is a `RwLock<Vec<Event>>`, not a durable store.
//! Ordering within a `run_id` follows arrival order (§5), which a single
//! lock around a single `Vec` gives for free.

use std::collections::HashMap;
use std::sync::RwLock;

use rlm_proto::{Event, RunId};

/// The in-process, best-effort event log every [`crate::sink::RunEventSink`]
/// appends to alongside publishing on the live bus.
pub struct EventLog {
    runs: RwLock<HashMap<RunId, Vec<Event>>>,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self { runs: RwLock::new(HashMap::new()) }
    }

    /// Append one event to its Run's log.
    pub fn append(&self, event: Event) {
        let mut runs = self.runs.write().unwrap();
        runs.entry(event.run_id.clone()).or_default().push(event);
    }

    /// Snapshot every event recorded for `run_id`, in arrival order.
    /// Returns an empty vector for a Run this log has never seen.
    pub fn events(&self, run_id: &RunId) -> Vec<Event> {
        self.runs.read().unwrap().get(run_id).cloned().unwrap_or_default()
    }

    /// Number of events recorded for `run_id`.
    pub fn len(&self, run_id: &RunId) -> usize {
        self.runs.read().unwrap().get(run_id).map(Vec::len).unwrap_or(0)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
