//! Invalidation events for externally cached access decisions.
//!
//! Every graph mutation names the items whose decisions may have changed:
//! the edge's `from` item plus everything that transitively depends on it.
//! Cache maintenance belongs to subscribers; the engine only announces.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// What changed in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InvalidationCause {
    PrerequisiteAdded { from: String, to: String },
    PrerequisiteRemoved { from: String, to: String },
    ItemDeleted { item_id: String },
}

/// Cached decisions for `affected` items are stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationEvent {
    #[serde(flatten)]
    pub cause: InvalidationCause,
    /// Root item first, then transitive dependents in ascending ID order.
    pub affected: Vec<String>,
}

impl InvalidationEvent {
    pub fn new(cause: InvalidationCause, root: &str, dependents: Vec<String>) -> Self {
        let mut affected = Vec::with_capacity(dependents.len() + 1);
        affected.push(root.to_string());
        affected.extend(dependents.into_iter().filter(|id| id != root));
        Self { cause, affected }
    }

    pub fn affects(&self, item_id: &str) -> bool {
        self.affected.iter().any(|id| id == item_id)
    }
}

/// Synchronous subscriber, called after a mutation commits.
pub trait InvalidationListener: Send + Sync {
    fn on_invalidate(&self, event: &InvalidationEvent);
}

/// Broadcast bus for async subscribers.
pub struct InvalidationBus {
    sender: broadcast::Sender<InvalidationEvent>,
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InvalidationListener for InvalidationBus {
    fn on_invalidate(&self, event: &InvalidationEvent) {
        // No receivers is fine.
        let _ = self.sender.send(event.clone());
    }
}

/// Audit listener that writes every event to the log.
pub struct LoggingListener;

impl InvalidationListener for LoggingListener {
    fn on_invalidate(&self, event: &InvalidationEvent) {
        match &event.cause {
            InvalidationCause::PrerequisiteAdded { from, to } => {
                debug!(from = %from, to = %to, affected = event.affected.len(), "invalidate: prerequisite added");
            }
            InvalidationCause::PrerequisiteRemoved { from, to } => {
                debug!(from = %from, to = %to, affected = event.affected.len(), "invalidate: prerequisite removed");
            }
            InvalidationCause::ItemDeleted { item_id } => {
                debug!(item = %item_id, affected = event.affected.len(), "invalidate: item deleted");
            }
        }
    }
}

/// Registered listeners, dispatched in registration order.
#[derive(Default, Clone)]
pub struct Listeners {
    inner: Vec<Arc<dyn InvalidationListener>>,
}

impl Listeners {
    pub fn push(&mut self, listener: Arc<dyn InvalidationListener>) {
        self.inner.push(listener);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn dispatch(&self, event: &InvalidationEvent) {
        trace!(event = ?event, "dispatching invalidation");
        for listener in &self.inner {
            listener.on_invalidate(event);
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::{Duration, timeout};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<InvalidationEvent>>,
    }

    impl InvalidationListener for Recorder {
        fn on_invalidate(&self, event: &InvalidationEvent) {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(event.clone());
            }
        }
    }

    fn removed(from: &str, to: &str) -> InvalidationCause {
        InvalidationCause::PrerequisiteRemoved {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn root_is_listed_first_and_not_repeated() {
        let event = InvalidationEvent::new(
            removed("b", "a"),
            "b",
            vec!["b".to_string(), "c".to_string()],
        );
        assert_eq!(event.affected, vec!["b", "c"]);
        assert!(event.affects("c"));
        assert!(!event.affects("a"));
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let mut listeners = Listeners::default();
        listeners.push(first.clone());
        listeners.push(second.clone());

        listeners.dispatch(&InvalidationEvent::new(removed("b", "a"), "b", Vec::new()));

        assert_eq!(first.seen.lock().expect("lock").len(), 1);
        assert_eq!(second.seen.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn bus_delivers_to_async_subscribers() {
        let bus = InvalidationBus::new();
        let mut receiver = bus.subscribe();

        bus.on_invalidate(&InvalidationEvent::new(
            InvalidationCause::ItemDeleted {
                item_id: "a".to_string(),
            },
            "a",
            vec!["b".to_string()],
        ));

        let event = timeout(Duration::from_millis(100), receiver.recv())
            .await
            .expect("timeout")
            .expect("receive error");
        assert_eq!(event.affected, vec!["a", "b"]);
    }

    #[test]
    fn bus_without_subscribers_does_not_panic() {
        let bus = InvalidationBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        bus.on_invalidate(&InvalidationEvent::new(removed("b", "a"), "b", Vec::new()));
    }

    #[test]
    fn event_serializes_cause_inline() {
        let event = InvalidationEvent::new(
            InvalidationCause::PrerequisiteAdded {
                from: "c".to_string(),
                to: "a".to_string(),
            },
            "c",
            Vec::new(),
        );
        let value = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(value["cause"], "prerequisite_added");
        assert_eq!(value["from"], "c");
        assert_eq!(value["affected"][0], "c");
    }

    #[test]
    fn item_deleted_payload_is_camel_case() {
        let event = InvalidationEvent::new(
            InvalidationCause::ItemDeleted {
                item_id: "a".to_string(),
            },
            "a",
            vec!["b".to_string()],
        );
        let value = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(
            value,
            serde_json::json!({
                "cause": "item_deleted",
                "itemId": "a",
                "affected": ["a", "b"],
            })
        );

        let parsed: InvalidationEvent =
            serde_json::from_value(value).expect("event should deserialize");
        assert_eq!(parsed, event);
    }
}
