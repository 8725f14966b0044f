//! # Event subscribers.
//!
//! The [`Subscribe`] trait plus the [`SubscriberSet`] fan-out that drives every
//! subscriber from its own bounded queue.
//!
//! ```text
//! Supervisor ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                          ┌──────────┼──────────┐
//!                                                          ▼          ▼          ▼
//!                                                      LogWriter   metrics    custom
//! ```
//!
//! - [`LogWriter`] (feature `logging`) prints status lines and the termination report.

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub(crate) use set::panic_message;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
