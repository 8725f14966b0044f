//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor` (status, hang, lifecycle, shutdown),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the subscriber listener spawned by `SupervisorBuilder::build`,
//!   which fans out to every [`Subscribe`](crate::Subscribe) implementation.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
