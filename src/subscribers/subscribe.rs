//! # Subscriber trait
//!
//! `Subscribe` is how observers plug into a stress run. Each subscriber is
//! driven by its own worker task fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Slow subscribers never stall the watchdog loop nor other subscribers.
//! - Each subscriber declares its queue capacity via [`Subscribe::queue_capacity`].
//!   On overflow the event is dropped for that subscriber and a
//!   [`SubscriberOverflow`](crate::EventKind::SubscriberOverflow) event is published.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use stressvisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct HangCounter(AtomicU64);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for HangCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::HangDetected {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "hang-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated tokio task; avoid blocking the runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
