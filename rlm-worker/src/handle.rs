//! `WorkerHandle` — the cloneable front door to a running Worker (§4.2,
//! §4.4).
//!
//! This is the only thing ever handed to the Evaluator's sandbox
//! bindings (as `Arc<dyn WorkerFacing>`) and the only thing the public
//! API holds to drive a session. Every method is "send a request into
//! the Worker's own mailbox, await the matching `oneshot` reply" — from
//! the sandbox's point of view a `lm_query` call is indistinguishable
//! from any other message the Worker's inbox happens to be draining.

use async_trait::async_trait;
use rlm_proto::{
    DirectQueryOutcome, DirectQueryRequest, Message, SpanId, SubcallOutcome, SubcallRequest, ToolOutcome, ToolRequest,
    WorkerFacing,
};
use tokio::sync::{mpsc, oneshot};

use crate::error::WorkerError;
use crate::mailbox::WorkerMsg;
use crate::state::WorkerSnapshot;

/// A cheap, cloneable reference to a running Worker's mailbox.
#[derive(Clone)]
pub struct WorkerHandle {
    span_id: SpanId,
    sender: mpsc::Sender<WorkerMsg>,
}

impl WorkerHandle {
    pub(crate) fn new(span_id: SpanId, sender: mpsc::Sender<WorkerMsg>) -> Self {
        Self { span_id, sender }
    }

    /// The Worker's own span id.
    pub fn span_id(&self) -> &SpanId {
        &self.span_id
    }

    /// Drive one turn. Errors with [`WorkerError::Busy`] if a turn is
    /// already running (§4.2's keep-alive contract).
    pub async fn send_message(&self, text: impl Into<String>) -> Result<serde_json::Value, WorkerError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(WorkerMsg::SendMessage { text: text.into(), reply })
            .await
            .map_err(|_| WorkerError::Cancelled)?;
        rx.await.map_err(|_| WorkerError::Cancelled)?
    }

    /// Snapshot the Worker's full message history.
    pub async fn history(&self) -> Vec<Message> {
        let (reply, rx) = oneshot::channel();
        if self.sender.send(WorkerMsg::History { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Snapshot the Worker's current status.
    pub async fn status(&self) -> Option<WorkerSnapshot> {
        let (reply, rx) = oneshot::channel();
        if self.sender.send(WorkerMsg::Status { reply }).await.is_err() {
            return None;
        }
        rx.await.ok()
    }

    /// Request the Worker terminate. Does not wait for teardown to finish.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(WorkerMsg::Shutdown).await;
    }
}

#[async_trait]
impl WorkerFacing for WorkerHandle {
    async fn lm_query(&self, req: SubcallRequest) -> SubcallOutcome {
        let (reply, rx) = oneshot::channel();
        if self.sender.send(WorkerMsg::SpawnSubcall { req, reply }).await.is_err() {
            return Err("worker shut down".to_string());
        }
        rx.await.unwrap_or_else(|_| Err("worker shut down mid-call".to_string()))
    }

    async fn parallel_query(&self, reqs: Vec<SubcallRequest>) -> Vec<SubcallOutcome> {
        let count = reqs.len();
        let (reply, rx) = oneshot::channel();
        if self.sender.send(WorkerMsg::ParallelSubcall { reqs, reply }).await.is_err() {
            return (0..count).map(|_| Err("worker shut down".to_string())).collect();
        }
        rx.await.unwrap_or_else(|_| (0..count).map(|_| Err("worker shut down mid-call".to_string())).collect())
    }

    async fn direct_query(&self, req: DirectQueryRequest) -> DirectQueryOutcome {
        let (reply, rx) = oneshot::channel();
        if self.sender.send(WorkerMsg::DirectQuery { req, reply }).await.is_err() {
            return Err("worker shut down".to_string());
        }
        rx.await.unwrap_or_else(|_| Err("worker shut down mid-call".to_string()))
    }

    async fn tool_call(&self, req: ToolRequest) -> ToolOutcome {
        let (reply, rx) = oneshot::channel();
        if self.sender.send(WorkerMsg::ToolCall { req, reply }).await.is_err() {
            return Err("worker shut down".to_string());
        }
        rx.await.unwrap_or_else(|_| Err("worker shut down mid-call".to_string()))
    }
}
