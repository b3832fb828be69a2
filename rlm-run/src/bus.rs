//! The live event bus: one `broadcast` channel per Run, keyed by `RunId`,
//! realizing the `run:<run_id>` topic from §4.6.

use std::collections::HashMap;
use std::sync::Mutex;

use rlm_proto::{Event, RunId};
use tokio::sync::broadcast;

/// Bounded history a late subscriber can miss before it starts lagging.
/// Subscribers that fall this far behind see a `RecvError::Lagged` on
/// their next `recv()` rather than blocking the publisher.
const CHANNEL_CAPACITY: usize = 1_024;

/// Fans out [`Event`]s to live subscribers of a Run's `run:<run_id>` topic.
///
/// Channels are created lazily on first publish or subscribe and kept for
/// the lifetime of the bus — there is no explicit "close a Run's topic"
/// step, matching the non-goal on persistence durability: an idle
/// channel with no subscribers costs one empty `HashMap` entry.
pub struct EventBus {
    channels: Mutex<HashMap<RunId, broadcast::Sender<Event>>>,
}

impl EventBus {
    /// An empty bus with no topics yet.
    pub fn new() -> Self {
        Self { channels: Mutex::new(HashMap::new()) }
    }

    /// Subscribe to `run:<run_id>`. Creates the topic if this is the
    /// first subscriber (or publisher) to touch it.
    pub fn subscribe(&self, run_id: &RunId) -> broadcast::Receiver<Event> {
        self.sender_for(run_id).subscribe()
    }

    /// Publish one event on its own Run's topic. A topic with no current
    /// subscribers silently drops the event — per [`rlm_proto::EventSink`]'s
    /// contract, publishing is best-effort and must never propagate an
    /// error into the Worker loop.
    pub fn publish(&self, event: Event) {
        let sender = self.sender_for(&event.run_id);
        let _ = sender.send(event);
    }

    fn sender_for(&self, run_id: &RunId) -> broadcast::Sender<Event> {
        let mut channels = self.channels.lock().unwrap();
        channels.entry(run_id.clone()).or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0).clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_proto::EventKind;
    use serde_json::json;

    fn event(run_id: &str) -> Event {
        Event::new(RunId::new(run_id), "span-1".into(), None, EventKind::NodeStart, 0, json!({}))
    }

    #[tokio::test]
    async fn subscriber_receives_events_published_after_subscribing() {
        let bus = EventBus::new();
        let run_id = RunId::new("run-1");
        let mut rx = bus.subscribe(&run_id);

        bus.publish(event("run-1"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.run_id, run_id);
    }

    #[tokio::test]
    async fn topics_are_isolated_per_run() {
        let bus = EventBus::new();
        let mut rx_a = bus.subscribe(&RunId::new("run-a"));
        let _rx_b = bus.subscribe(&RunId::new("run-b"));

        bus.publish(event("run-b"));

        let result = tokio::time::timeout(std::time::Duration::from_millis(50), rx_a.recv()).await;
        assert!(result.is_err(), "run-a subscriber should not see run-b's events");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(event("run-nobody-is-watching"));
    }
}
