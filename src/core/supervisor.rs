//! # Supervisor: workers, watchdog loop, and shutdown.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], and the run
//! configuration. [`Supervisor::run`] starts the workers, polls their counters,
//! and decides between graceful stop and forced abort.
//!
//! ## Architecture
//! ```text
//! run():
//!   cfg.validate()
//!   subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   ArtifactPool(capacity = pool_multiplier × N)
//!   Worker::spawn(0..N)  ──► publish WorkerStarted
//!
//! poll loop (every poll_interval):
//!   ├─ stop token cancelled  ─► ShutdownRequested            ─┐
//!   ├─ OS signal             ─► ShutdownRequested            ─┤
//!   └─ tick:                                                   │
//!        refresh(i, counter[i]) for all i                      │
//!        publish StatusReport(summary)                         │
//!        hung(hang_limit) non-empty:                           │
//!          HangDetected ─► abort() ─► WorkerAborted          ─┤
//!                                                              ▼
//! shutdown:
//!   request_stop() on every worker
//!   join_until(now + grace) for all (concurrently)
//!     ├─ exited   ─► WorkerStopped
//!     └─ deadline ─► WorkerDetached
//!   AllStoppedWithin | GraceExceeded
//!   pool.drain() ─► PoolDrained
//! ```
//!
//! ## Rules
//! - Only workers whose age exceeds `hang_limit` are aborted; healthy ones
//!   get a cooperative stop.
//! - A hang ends the polling loop.
//! - Without a hang, stop token, or signal the loop runs forever.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use stressvisor::{Config, SupervisorBuilder, SyntheticWorkload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.workers = 4;
//!     cfg.hang_limit = Duration::from_secs(30);
//!
//!     let sup = SupervisorBuilder::new(cfg, Arc::new(SyntheticWorkload::new())).build();
//!     let report = sup.run().await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::watchdog::HangWatchdog;
use crate::core::worker::{Worker, WorkerExit, WorkerState};
use crate::core::shutdown;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::pool::ArtifactPool;
use crate::subscribers::SubscriberSet;
use crate::workload::Workload;

/// Far enough to never fire, small enough not to overflow `Instant`.
const FOREVER: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Why the polling loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The stop token was cancelled.
    Requested,
    /// An OS termination signal arrived.
    Signal(&'static str),
    /// At least one worker exceeded the hang limit.
    Hang,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Requested => f.write_str("stop requested"),
            StopReason::Signal(sig) => write!(f, "signal {sig}"),
            StopReason::Hang => f.write_str("hang detected"),
        }
    }
}

/// Outcome of [`Supervisor::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub reason: StopReason,
    /// Indices of workers declared hung (empty unless `reason` is `Hang`).
    pub hung: Vec<usize>,
    /// One entry per worker, in index order.
    pub exits: Vec<WorkerExit>,
    /// Artifacts destroyed because the pool was full.
    pub pool_overflowed: u64,
    /// Artifacts left in the pool and disposed after the run.
    pub pool_drained: usize,
}

impl RunReport {
    pub fn exit(&self, index: usize) -> Option<&WorkerExit> {
        self.exits.iter().find(|e| e.index == index)
    }

    /// Workers still running when the grace period ran out.
    pub fn detached(&self) -> impl Iterator<Item = &WorkerExit> {
        self.exits.iter().filter(|e| e.detached)
    }

    pub fn aborted(&self) -> impl Iterator<Item = &WorkerExit> {
        self.exits
            .iter()
            .filter(|e| e.state == WorkerState::Aborted)
    }

    pub fn total_iterations(&self) -> u64 {
        self.exits.iter().map(|e| e.iterations).sum()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run ended: {} (iterations={} pool_overflowed={} pool_drained={})",
            self.reason,
            self.total_iterations(),
            self.pool_overflowed,
            self.pool_drained
        )?;
        for exit in &self.exits {
            writeln!(f, "  {exit}")?;
        }
        Ok(())
    }
}

/// Runs a stress session over a [`Workload`].
pub struct Supervisor<W: Workload> {
    cfg: Config,
    workload: Arc<W>,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    stop: CancellationToken,
}

impl<W: Workload> Supervisor<W> {
    /// Creates a supervisor without subscribers.
    ///
    /// Must be called inside a tokio runtime; see [`SupervisorBuilder`](crate::SupervisorBuilder).
    pub fn new(cfg: Config, workload: Arc<W>) -> Self {
        crate::SupervisorBuilder::new(cfg, workload).build()
    }

    pub(crate) fn new_internal(
        cfg: Config,
        workload: Arc<W>,
        bus: Bus,
        subs: Arc<SubscriberSet>,
    ) -> Self {
        Self {
            cfg,
            workload,
            bus,
            subs,
            stop: CancellationToken::new(),
        }
    }

    /// Token that ends the polling loop when cancelled.
    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs until a hang, a stop request, or an OS signal, then shuts down.
    pub async fn run(&self) -> Result<RunReport, RuntimeError> {
        self.cfg.validate()?;
        let listener_done = CancellationToken::new();
        let listener = self.subscriber_listener(listener_done.clone());

        let result = self.run_inner().await;

        listener_done.cancel();
        let _ = listener.await;
        result
    }

    /// Waits for every subscriber to drain its queue.
    pub async fn close(self) {
        if let Ok(set) = Arc::try_unwrap(self.subs) {
            set.shutdown().await;
        }
    }

    async fn run_inner(&self) -> Result<RunReport, RuntimeError> {
        let n = self.cfg.worker_count();
        let pool = Arc::new(ArtifactPool::new(self.cfg.pool_capacity(n)));
        let wcfg = Arc::new(self.cfg.worker.clone());

        let mut workers = Vec::with_capacity(n);
        for i in 0..n {
            let seed = self.cfg.seed.wrapping_add(i as u64);
            let spawned = Worker::spawn(
                i,
                Arc::clone(&self.workload),
                Arc::clone(&pool),
                Arc::clone(&wcfg),
                seed,
            );
            match spawned {
                Ok(w) => {
                    self.bus
                        .publish(Event::new(EventKind::WorkerStarted).with_worker(w.name()));
                    workers.push(w);
                }
                Err(e) => {
                    self.stop_and_join(workers).await;
                    return Err(e);
                }
            }
        }

        let mut watchdog = HangWatchdog::new(n);
        let (reason, hung) = self.poll(&workers, &mut watchdog).await;
        let exits = self.stop_and_join(workers).await;

        let drained = pool.drain();
        self.bus.publish(
            Event::new(EventKind::PoolDrained).with_iterations(drained as u64),
        );

        Ok(RunReport {
            reason,
            hung,
            exits,
            pool_overflowed: pool.overflowed(),
            pool_drained: drained,
        })
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// After `done` fires, forwards whatever is already queued and exits.
    fn subscriber_listener(&self, done: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => return,
                    },
                    _ = done.cancelled() => break,
                }
            }
            while let Ok(ev) = rx.try_recv() {
                set.emit(&ev);
            }
        })
    }

    async fn poll(
        &self,
        workers: &[Worker],
        watchdog: &mut HangWatchdog,
    ) -> (StopReason, Vec<usize>) {
        let mut ticker = tokio::time::interval(self.cfg.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let signal = os_signal(self.cfg.handle_os_signals);
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.stop.cancelled() => {
                    self.bus.publish(
                        Event::new(EventKind::ShutdownRequested).with_reason("stop requested"),
                    );
                    return (StopReason::Requested, Vec::new());
                }
                sig = &mut signal => {
                    self.bus.publish(Event::new(EventKind::ShutdownRequested).with_reason(sig));
                    return (StopReason::Signal(sig), Vec::new());
                }
            }

            for w in workers {
                watchdog.refresh(w.index(), w.counter());
            }
            self.bus
                .publish(Event::new(EventKind::StatusReport).with_status(watchdog.summarize()));

            let hung = watchdog.hung(self.cfg.hang_limit);
            if hung.is_empty() {
                continue;
            }
            for &i in &hung {
                let w = &workers[i];
                self.bus.publish(
                    Event::new(EventKind::HangDetected)
                        .with_worker(w.name())
                        .with_age(watchdog.age_of_update(i))
                        .with_limit(self.cfg.hang_limit),
                );
                if w.abort() {
                    self.bus.publish(
                        Event::new(EventKind::WorkerAborted)
                            .with_worker(w.name())
                            .with_iterations(w.counter())
                            .with_reason(w.trace()),
                    );
                }
            }
            return (StopReason::Hang, hung);
        }
    }

    /// Requests a cooperative stop everywhere, then joins with a shared deadline.
    async fn stop_and_join(&self, workers: Vec<Worker>) -> Vec<WorkerExit> {
        for w in &workers {
            w.request_stop();
        }
        let deadline = Instant::now() + self.cfg.grace.min(FOREVER);
        let exits =
            futures::future::join_all(workers.into_iter().map(|w| w.join_until(deadline))).await;

        let mut detached = false;
        for exit in &exits {
            let kind = if exit.detached {
                detached = true;
                EventKind::WorkerDetached
            } else {
                EventKind::WorkerStopped
            };
            let mut ev = Event::new(kind)
                .with_worker(Arc::clone(&exit.name))
                .with_iterations(exit.iterations);
            if !exit.trace.is_empty() {
                ev = ev.with_reason(exit.trace.as_str());
            }
            self.bus.publish(ev);
        }

        self.bus.publish(Event::new(if detached {
            EventKind::GraceExceeded
        } else {
            EventKind::AllStoppedWithin
        }));
        exits
    }
}

async fn os_signal(enabled: bool) -> &'static str {
    if enabled {
        if let Ok(sig) = shutdown::wait_for_shutdown_signal().await {
            return sig;
        }
    }
    std::future::pending().await
}
