//! The event sink collaborator interface.
//!
//! `EventBus` (rlm-run) is the primary sink, fanning events out to
//! `broadcast` subscribers and the in-process [`Event`](crate::event::Event)
//! log. This trait lets a caller swap in or add an external sink (a
//! telemetry exporter, a durable store) without the Worker/Run code
//! depending on any concrete transport — the `tracing` subscriber is a
//! natural second sink, since every event is also emitted as a
//! `tracing::event!` at matching severity.

use async_trait::async_trait;

use crate::event::Event;

/// Receives every lifecycle [`Event`] the engine emits.
///
/// Implementations must not block the caller for long: the Worker emits
/// events inline on its own execution context, so a slow sink delays the
/// Worker loop.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish one event. Infallible by contract: a sink that cannot keep
    /// up drops events rather than propagating an error into the Worker
    /// loop (this matches the non-goal of guaranteeing log durability).
    async fn publish(&self, event: Event);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn EventSink) {}
}
