//! The Worker's inbox message shape (§4.2 "Worker internals").
//!
//! Every request the Worker services — external (`SendMessage`,
//! `History`, `Status`, `Shutdown`) and sandbox-originated
//! (`SpawnSubcall`, `ParallelSubcall`, `DirectQuery`, `ToolCall`) — is one
//! variant of this enum, multiplexed through the same `mpsc` channel. The
//! `*Settled` variants are not sent by any external caller; the Worker
//! sends them to itself from a background task once a spawned child, LLM
//! call, or tool call finishes, so that awaiting it never blocks the
//! inbox loop.

use rlm_proto::{DirectQueryOutcome, DirectQueryRequest, Message, SubcallOutcome, SubcallRequest, ToolOutcome, ToolRequest};
use tokio::sync::oneshot;

use crate::error::WorkerError;
use crate::state::WorkerSnapshot;

pub(crate) enum WorkerMsg {
    SendMessage { text: String, reply: oneshot::Sender<Result<serde_json::Value, WorkerError>> },
    History { reply: oneshot::Sender<Vec<Message>> },
    Status { reply: oneshot::Sender<WorkerSnapshot> },
    Shutdown,

    SpawnSubcall { req: SubcallRequest, reply: oneshot::Sender<SubcallOutcome> },
    SubcallSettled { reply: oneshot::Sender<SubcallOutcome>, outcome: SubcallOutcome },

    ParallelSubcall { reqs: Vec<SubcallRequest>, reply: oneshot::Sender<Vec<SubcallOutcome>> },
    ParallelSettled {
        reply: oneshot::Sender<Vec<SubcallOutcome>>,
        partial: Vec<Option<SubcallOutcome>>,
        settled: Vec<(usize, SubcallOutcome)>,
        admitted_count: usize,
    },

    DirectQuery { req: DirectQueryRequest, reply: oneshot::Sender<DirectQueryOutcome> },
    DirectQuerySettled { reply: oneshot::Sender<DirectQueryOutcome>, outcome: DirectQueryOutcome },

    ToolCall { req: ToolRequest, reply: oneshot::Sender<ToolOutcome> },
    ToolCallSettled { reply: oneshot::Sender<ToolOutcome>, outcome: ToolOutcome },
}
