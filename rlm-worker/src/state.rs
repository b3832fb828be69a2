//! Worker state-machine types (§4.2).

use serde::{Deserialize, Serialize};

/// Whether a Worker takes one turn and terminates, or stays alive across
/// many `send_message` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// Takes `context`/`query` at construction, auto-starts, terminates
    /// after the first turn.
    OneShot,
    /// Starts idle; `send_message` drives one turn at a time; bindings
    /// persist across turns.
    KeepAlive,
}

/// The three states in §4.2's transition table. Keep-alive Workers never
/// reach `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// No turn in progress.
    Idle,
    /// A turn is running.
    Running,
    /// A one-shot Worker has finished its single turn.
    Complete,
}

/// A point-in-time snapshot returned by `status()` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    /// Current state-machine status.
    pub status: WorkerStatus,
    /// Iterations run in the current (or most recently completed) turn.
    pub iteration: usize,
    /// Number of turns completed so far.
    pub turn: usize,
}
