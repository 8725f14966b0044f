//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. `publish` is a plain synchronous
//! call, so the supervisor loop and (if ever needed) worker OS threads can
//! publish without an async context.
//!
//! ```text
//! Supervisor loop ──┐
//! Worker joins    ──┼──► Bus ───► subscriber_listener ───► SubscriberSet
//! SubscriberSet   ──┘  (broadcast)    (spawned by builder)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: never waits for receivers.
//! - **Bounded capacity**: one ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers observe `RecvError::Lagged(n)` and skip `n` items.
//! - **No persistence**: events published with no receiver are lost.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers; drops it if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver for events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
