#![deny(missing_docs)]
//! The Run supervisor, sub-call scheduler, and event bus/log for the RLM
//! engine (§2, §3, §4.3, §4.6).
//!
//! [`RunSupervisor`] is what the `rlm` umbrella crate constructs per
//! end-to-end invocation: it owns the root [`rlm_worker::WorkerHandle`],
//! admits and spawns every descendant sub-call Worker on the parent's
//! behalf, and cascades a single [`tokio_util::sync::CancellationToken`]
//! cancellation to the whole tree on [`RunSupervisor::terminate`]. The
//! scheduling half of that job ([`SchedulerError`]'s admission rules) is
//! deliberately thin — the heavier per-turn admission check
//! (`max_concurrent_subcalls`) already happens inside `rlm-worker` before
//! a spawn request ever reaches this crate; this crate only owns the
//! depth bound and the bookkeeping a child needs to resolve its parent's
//! context.
//!
//! [`RunEventSink`] is the default [`rlm_proto::EventSink`] wired into
//! every Worker a [`RunSupervisor`] spawns: it fans events out on the
//! live [`EventBus`] topic, appends them to the best-effort [`EventLog`],
//! and mirrors them into `tracing`.

mod bus;
mod error;
mod log;
mod sink;
mod supervisor;

pub use bus::EventBus;
pub use error::SchedulerError;
pub use log::EventLog;
pub use sink::RunEventSink;
pub use supervisor::RunSupervisor;
