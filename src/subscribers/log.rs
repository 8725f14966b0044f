//! # LogWriter: console output for a stress run
//!
//! Prints incoming [`Event`]s to stdout. Status lines carry the counter total
//! and per-worker ages; the termination report is one line per worker.
//!
//! ## Example output
//! ```text
//! [started] worker-0
//! [status] 48213    0.0    0.4    1.0  201.3
//! [hang] worker-3 no progress for 201.3s (limit 200.0s)
//! [aborted] worker-3 iterations=1207 trace="worker-3 aborted at iteration 1207 during apply(blur)"
//! [stopped] worker-0 iterations=12044 trace=""
//! [detached] worker-3 iterations=1207 trace="worker-3 aborted at iteration 1207 during apply(blur)"
//! [grace-exceeded]
//! [pool-drained] disposed=8
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn secs(ms: Option<u64>) -> f64 {
    ms.unwrap_or(0) as f64 / 1000.0
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("unknown");
        let trace = e.reason.as_deref().unwrap_or("");
        let iterations = e.iterations.unwrap_or(0);
        match e.kind {
            EventKind::WorkerStarted => {
                println!("[started] {worker}");
            }
            EventKind::StatusReport => {
                if let Some(status) = &e.status {
                    println!("[status] {status}");
                }
            }
            EventKind::HangDetected => {
                println!(
                    "[hang] {worker} no progress for {:.1}s (limit {:.1}s)",
                    secs(e.age_ms),
                    secs(e.limit_ms)
                );
            }
            EventKind::WorkerAborted => {
                println!("[aborted] {worker} iterations={iterations} trace={trace:?}");
            }
            EventKind::WorkerStopped => {
                println!("[stopped] {worker} iterations={iterations} trace={trace:?}");
            }
            EventKind::WorkerDetached => {
                println!("[detached] {worker} iterations={iterations} trace={trace:?}");
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested] reason={trace:?}");
            }
            EventKind::AllStoppedWithin => {
                println!("[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded]");
            }
            EventKind::PoolDrained => {
                println!("[pool-drained] disposed={iterations}");
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={worker} reason={trace}");
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={worker} info={trace}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
