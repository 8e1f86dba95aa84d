//! Event channel bridge using crossbeam-channel.
//!
//! The bus delivers synchronously on the pipeline thread; UI layers usually
//! want to drain events from their own thread instead. `EventBridge`
//! subscribes a forwarding handler for each event kind and exposes the
//! stream through a cloneable receiver, without changing bus delivery
//! semantics.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;

use super::bus::{EventBus, SubscriberId};
use super::types::{Event, EventKind};

/// Receives bridged events from the bus.
///
/// Used by UI layers to consume progress off the pipeline thread.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event is received
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Returns an iterator over received events
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Forwards bus events into a channel; unsubscribes on drop.
pub struct EventBridge {
    bus: Arc<EventBus>,
    subscriptions: Vec<(EventKind, SubscriberId)>,
}

impl EventBridge {
    /// Attach a bridge for all file-lifecycle event kinds.
    ///
    /// Dropping the returned bridge detaches it from the bus; dropping the
    /// receiver simply discards further events (sends into a disconnected
    /// channel are ignored).
    pub fn attach(bus: Arc<EventBus>) -> (Self, EventReceiver) {
        let (sender, receiver) = unbounded();

        let kinds = [EventKind::Copied, EventKind::Renamed, EventKind::Deleted];
        let subscriptions = kinds
            .iter()
            .map(|&kind| {
                let sender: Sender<Event> = sender.clone();
                let id = bus.subscribe(kind, move |event| {
                    // Ignore send errors - a dropped receiver just means
                    // nobody is watching progress anymore
                    let _ = sender.send(event.clone());
                });
                (kind, id)
            })
            .collect();

        (
            Self { bus, subscriptions },
            EventReceiver { inner: receiver },
        )
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        for (kind, id) in self.subscriptions.drain(..) {
            self.bus.unsubscribe(kind, id);
        }
    }
}
