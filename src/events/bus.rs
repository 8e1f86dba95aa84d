//! Synchronous in-process event bus.
//!
//! Subscribers register handlers per event kind; `publish` delivers to every
//! handler in registration order and only returns once all of them ran. That
//! ordering guarantee is what keeps the verifier's expected state consistent
//! with the pipeline's view at the moment the pipeline logs success.
//!
//! The bus is scoped to a pipeline run and injected explicitly - it is not a
//! process-wide singleton.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::types::{Event, EventKind};

/// Handle returned by `subscribe`, used to unsubscribe later
pub type SubscriberId = u64;

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Subscriber {
    id: SubscriberId,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: SubscriberId,
    subscribers: HashMap<EventKind, Vec<Subscriber>>,
}

/// Typed publish/subscribe registry with synchronous delivery
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    ///
    /// Handlers run synchronously on the publishing thread, in registration
    /// order. They must not publish back into the bus.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriberId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.entry(kind).or_default().push(Subscriber {
            id,
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove a previously registered handler.
    ///
    /// Returns true if the handler was found and removed.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriberId) -> bool {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        match inner.subscribers.get_mut(&kind) {
            Some(subscribers) => {
                let before = subscribers.len();
                subscribers.retain(|s| s.id != id);
                subscribers.len() != before
            }
            None => false,
        }
    }

    /// Deliver an event to all handlers registered for its kind.
    ///
    /// Does not return until every handler has been notified. Handlers are
    /// snapshotted before dispatch so a handler may unsubscribe itself
    /// without deadlocking.
    pub fn publish(&self, event: &Event) {
        let handlers: Vec<Handler> = {
            let inner = self.inner.lock().expect("event bus lock poisoned");
            match inner.subscribers.get(&event.kind()) {
                Some(subscribers) => subscribers.iter().map(|s| s.handler.clone()).collect(),
                None => return,
            }
        };

        for handler in handlers {
            handler(event);
        }
    }

    /// Number of handlers registered for an event kind
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        let inner = self.inner.lock().expect("event bus lock poisoned");
        inner.subscribers.get(&kind).map_or(0, |s| s.len())
    }

    /// Remove all subscriptions. Useful for testing.
    pub fn clear_all_subscriptions(&self) {
        let mut inner = self.inner.lock().expect("event bus lock poisoned");
        inner.subscribers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FileDeletedEvent;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn deleted(path: &str, size: u64) -> Event {
        Event::Deleted(FileDeletedEvent::new(Path::new(path), size).unwrap())
    }

    #[test]
    fn publish_reaches_subscriber() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        bus.subscribe(EventKind::Deleted, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&deleted("/dst/a.jpg", 1));
        bus.publish(&deleted("/dst/b.jpg", 2));

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn publish_ignores_other_kinds() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        bus.subscribe(EventKind::Copied, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&deleted("/dst/a.jpg", 1));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            bus.subscribe(EventKind::Deleted, move |_| {
                order.lock().unwrap().push(label);
            });
        }

        bus.publish(&deleted("/dst/a.jpg", 1));

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn delivery_is_complete_when_publish_returns() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        bus.subscribe(EventKind::Deleted, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&deleted("/dst/a.jpg", 1));
        // No draining step: synchronous delivery means the count is already final.
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let id = bus.subscribe(EventKind::Deleted, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(bus.unsubscribe(EventKind::Deleted, id));
        assert!(!bus.unsubscribe(EventKind::Deleted, id));

        bus.publish(&deleted("/dst/a.jpg", 1));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscriber_count_tracks_registrations() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(EventKind::Renamed), 0);

        let id = bus.subscribe(EventKind::Renamed, |_| {});
        bus.subscribe(EventKind::Renamed, |_| {});
        assert_eq!(bus.subscriber_count(EventKind::Renamed), 2);

        bus.unsubscribe(EventKind::Renamed, id);
        assert_eq!(bus.subscriber_count(EventKind::Renamed), 1);
    }
}
