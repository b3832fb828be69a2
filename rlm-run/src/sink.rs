//! [`RunEventSink`] — the [`EventSink`] every Worker in a Run publishes
//! through: fans out on the live [`EventBus`] topic, appends to the
//! best-effort [`EventLog`], and mirrors every event as a `tracing::event!`
//! at a severity matching its kind, so a deployment that only wires up a
//! `tracing` subscriber still gets full lifecycle visibility without
//! touching the bus or log at all.

use std::sync::Arc;

use async_trait::async_trait;
use rlm_proto::{Event, EventKind, EventSink};

use crate::bus::EventBus;
use crate::log::EventLog;

/// The default `EventSink` wired into every Run: broadcast bus + append
/// log + tracing mirror.
pub struct RunEventSink {
    bus: Arc<EventBus>,
    log: Arc<EventLog>,
}

impl RunEventSink {
    /// Build a sink over a shared bus and log.
    pub fn new(bus: Arc<EventBus>, log: Arc<EventLog>) -> Self {
        Self { bus, log }
    }
}

#[async_trait]
impl EventSink for RunEventSink {
    async fn publish(&self, event: Event) {
        trace_event(&event);
        self.log.append(event.clone());
        self.bus.publish(event);
    }
}

fn trace_event(event: &Event) {
    match event.kind {
        EventKind::NodeStart | EventKind::NodeStop | EventKind::IterationStop | EventKind::SubcallSpawn => {
            tracing::debug!(
                run_id = %event.run_id,
                span_id = %event.span_id,
                kind = ?event.kind,
                payload = %event.payload,
                "rlm event"
            );
        }
        EventKind::SubcallResult | EventKind::DirectQueryStart | EventKind::DirectQueryStop => {
            let ok = event.payload.get("ok").and_then(|v| v.as_bool()).unwrap_or(true);
            if ok {
                tracing::debug!(run_id = %event.run_id, span_id = %event.span_id, kind = ?event.kind, "rlm event");
            } else {
                tracing::warn!(run_id = %event.run_id, span_id = %event.span_id, kind = ?event.kind, "rlm event failed");
            }
        }
        EventKind::TurnComplete => {
            let ok = event.payload.get("ok").and_then(|v| v.as_bool()).unwrap_or(true);
            if ok {
                tracing::info!(run_id = %event.run_id, span_id = %event.span_id, "turn complete");
            } else {
                tracing::warn!(run_id = %event.run_id, span_id = %event.span_id, "turn failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_proto::RunId;
    use serde_json::json;

    #[tokio::test]
    async fn publish_reaches_both_bus_and_log() {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(EventLog::new());
        let sink = RunEventSink::new(bus.clone(), log.clone());
        let run_id = RunId::new("run-1");
        let mut rx = bus.subscribe(&run_id);

        let event = Event::new(run_id.clone(), "span-1".into(), None, EventKind::NodeStart, 0, json!({}));
        sink.publish(event).await;

        assert_eq!(log.len(&run_id), 1);
        let seen = rx.recv().await.unwrap();
        assert_eq!(seen.run_id, run_id);
    }
}
