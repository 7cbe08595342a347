use tokio::sync::broadcast;

use crate::Event;

/// Broadcast bus carrying every observer-facing session event.
///
/// The session task publishes; any number of observers subscribe. Publishing
/// is a sync call so it works from timer callbacks and spawned attempt tasks
/// alike. With no subscribers attached, events are silently dropped.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Accepts any sub-enum value directly: `bus.publish(PlaybackEvent::Ended)`.
    pub fn publish<E: Into<Event>>(&self, event: E) {
        let _ = self.tx.send(event.into());
    }

    /// Subscribe to all future events.
    ///
    /// Each subscriber gets an independent receiver; a slow subscriber sees
    /// `RecvError::Lagged(n)` instead of blocking the publisher.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
