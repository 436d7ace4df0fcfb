//! Broadcast event bus for domain events.

use tokio::sync::broadcast;
use tracing::debug;

use super::{DomainEvent, ExtensionEvent};

/// Capacity of the broadcast channel; slow subscribers lag rather than
/// blocking publishers.
const BUS_CAPACITY: usize = 256;

/// Typed publish/subscribe bus for [`DomainEvent`]s.
///
/// Publishing never fails: an event with no subscribers is dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Publishes an extension event, wrapping it in a [`DomainEvent`].
    pub fn publish(&self, event: ExtensionEvent) {
        let event = DomainEvent::new(event);
        debug!(event = ?event.payload, "Publishing domain event");
        let _ = self.sender.send(event);
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
