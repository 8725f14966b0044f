//! # Runtime events emitted by the supervisor and workers.
//!
//! The [`EventKind`] enum classifies events into:
//! - **Worker lifecycle**: started, stopped, aborted, detached
//! - **Watchdog**: periodic status, hang detection
//! - **Shutdown**: stop requested, all stopped, grace exceeded, pool drained
//! - **Subscriber health**: overflow, panic
//!
//! The [`Event`] struct carries optional metadata (worker name, age, trace...).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use stressvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::HangDetected)
//!     .with_worker("worker-3")
//!     .with_age(Duration::from_secs(201))
//!     .with_limit(Duration::from_secs(200));
//!
//! assert_eq!(ev.kind, EventKind::HangDetected);
//! assert_eq!(ev.worker.as_deref(), Some("worker-3"));
//! assert_eq!(ev.age_ms, Some(201_000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::Summary;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Worker lifecycle ===
    /// Worker thread was spawned.
    ///
    /// Sets:
    /// - `worker`: worker name
    WorkerStarted,

    /// Worker exited through the cooperative stop path.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `iterations`: completed iterations
    WorkerStopped,

    /// Worker was forcibly aborted.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `iterations`: completed iterations at abort time
    /// - `reason`: captured trace
    WorkerAborted,

    /// Worker did not exit before the grace deadline and was left behind.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `iterations`: completed iterations
    /// - `reason`: captured trace (may be empty)
    WorkerDetached,

    // === Watchdog ===
    /// Periodic status line.
    ///
    /// Sets:
    /// - `status`: counter total and per-worker ages
    StatusReport,

    /// A worker made no progress for longer than the hang limit.
    ///
    /// Sets:
    /// - `worker`: worker name
    /// - `age_ms`: time since last progress (ms)
    /// - `limit_ms`: configured hang limit (ms)
    HangDetected,

    // === Shutdown ===
    /// The polling loop was asked to stop (stop handle or OS signal).
    ///
    /// Sets:
    /// - `reason`: what requested it
    ShutdownRequested,

    /// Every worker exited before the grace deadline.
    AllStoppedWithin,

    /// Some workers had to be detached at the grace deadline.
    GraceExceeded,

    /// Leftover pooled artifacts were disposed after the run.
    ///
    /// Sets:
    /// - `iterations`: number of artifacts disposed
    PoolDrained,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker (or subscriber) name, if applicable.
    pub worker: Option<Arc<str>>,
    /// Human-readable reason (trace, signal name, overflow details...).
    pub reason: Option<Arc<str>>,
    /// Time since the worker last made progress, in milliseconds.
    pub age_ms: Option<u64>,
    /// Hang limit in effect, in milliseconds.
    pub limit_ms: Option<u64>,
    /// Iteration count (or item count for [`EventKind::PoolDrained`]).
    pub iterations: Option<u64>,
    /// Watchdog summary for [`EventKind::StatusReport`].
    pub status: Option<Arc<Summary>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            reason: None,
            age_ms: None,
            limit_ms: None,
            iterations: None,
            status: None,
        }
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an age (stored as milliseconds).
    #[inline]
    pub fn with_age(mut self, d: Duration) -> Self {
        self.age_ms = Some(millis(d));
        self
    }

    /// Attaches the hang limit (stored as milliseconds).
    #[inline]
    pub fn with_limit(mut self, d: Duration) -> Self {
        self.limit_ms = Some(millis(d));
        self
    }

    #[inline]
    pub fn with_iterations(mut self, n: u64) -> Self {
        self.iterations = Some(n);
        self
    }

    #[inline]
    pub fn with_status(mut self, summary: Summary) -> Self {
        self.status = Some(Arc::new(summary));
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}
