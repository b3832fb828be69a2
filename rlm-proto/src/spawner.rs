//! The sub-call admission/spawn contract (§4.3).
//!
//! A Worker checks its own `active_subcalls` bound locally (no
//! synchronization needed — it's confined to the Worker's own task) and,
//! once admitted, asks its owning Run supervisor to actually create and
//! run the child. This trait is that ask, kept in `rlm-proto` so
//! `rlm-worker` never depends on `rlm-run` (which depends on
//! `rlm-worker`).

use async_trait::async_trait;

use crate::id::SpanId;
use crate::protocol::{SubcallOutcome, SubcallRequest};

/// Creates and runs one child Worker for a sub-call request already
/// admitted by the parent's own concurrency check.
#[async_trait]
pub trait SubcallSpawner: Send + Sync {
    /// Spawn a child Worker under `parent` and await its final answer (or
    /// the reason it failed, including a depth-limit rejection).
    async fn spawn_child(&self, parent: SpanId, req: SubcallRequest) -> SubcallOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn SubcallSpawner) {}
}
