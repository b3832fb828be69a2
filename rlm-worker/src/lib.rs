#![deny(missing_docs)]
//! The per-session Worker state machine for the RLM engine (§4.2).
//!
//! [`spawn`] starts a Worker on its own task and returns a
//! [`WorkerHandle`] — the only thing callers (the `rlm` umbrella crate, a
//! parent Worker's sandbox bridge, a Run supervisor) ever hold. Every
//! interaction multiplexes through the Worker's own `mpsc` inbox, which is
//! what keeps the loop in [`worker::spawn`] free of the deadlocks that a
//! naive "just `.await` the slow thing inline" implementation would hit
//! the moment a snippet calls back into its own Worker (§4.4).

mod error;
mod handle;
mod mailbox;
mod prompt;
mod state;
mod worker;

pub use error::WorkerError;
pub use handle::WorkerHandle;
pub use state::{WorkerMode, WorkerSnapshot, WorkerStatus};
pub use worker::{spawn, WorkerConfig};
