//! # Worker: one OS thread hammering the pool.
//!
//! A [`Worker`] owns a named OS thread (`worker-{i}`) that runs iterations
//! (see `runner`) until told to stop. The supervisor side only ever touches the
//! shared atomics and tokens.
//!
//! ## State machine
//! ```text
//!             request_stop()                 thread exits
//!   Running ────────────────► StopRequested ──────────────► Stopped
//!      │                            │
//!      │ abort()                    │ abort()
//!      └──────────────► Aborted ◄───┘        (terminal, trace captured)
//! ```
//!
//! ## Rules
//! - The counter is incremented once per completed iteration, only by the
//!   worker thread (`Release`), read by the supervisor (`Acquire`).
//! - Cooperative stop is observed only at the top of an iteration; the trace
//!   stays empty.
//! - Abort captures `"{name} aborted at iteration {n} during {stage}"`, then
//!   cancels the abort token. The thread notices it at the next stage boundary,
//!   drops its in-flight artifact without disposing it, and exits without
//!   counting the iteration.
//! - The iteration number in the abort trace is a snapshot taken by `abort()`.
//!   An abort landing after the last checkpoint of an iteration still lets that
//!   iteration count, so the final counter may be one higher.
//! - A thread stuck inside an operation cannot be killed. `join_until` gives up
//!   at the deadline and the thread is detached and reported as such.
//! - A panic escaping the iteration ends the thread as `Aborted` with a
//!   `"{name} panicked at iteration {n} during {stage}: {message}"` trace.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::core::runner::{self, Iteration};
use crate::error::RuntimeError;
use crate::policies::OperationSelector;
use crate::pool::ArtifactPool;
use crate::subscribers::panic_message;
use crate::workload::{OperationKind, Workload};

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Running = 0,
    StopRequested = 1,
    Aborted = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Running,
            1 => WorkerState::StopRequested,
            2 => WorkerState::Aborted,
            _ => WorkerState::Stopped,
        }
    }

    /// True for `Aborted` and `Stopped`.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Aborted | WorkerState::Stopped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Running => "running",
            WorkerState::StopRequested => "stop-requested",
            WorkerState::Aborted => "aborted",
            WorkerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where inside an iteration a worker currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Idle,
    Acquire,
    Household,
    Apply(OperationKind),
    Forward,
}

const APPLY_BASE: u8 = 16;

impl Stage {
    fn as_u8(self) -> u8 {
        match self {
            Stage::Idle => 0,
            Stage::Acquire => 1,
            Stage::Household => 2,
            Stage::Forward => 3,
            Stage::Apply(op) => APPLY_BASE + op.as_u8(),
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Stage::Acquire,
            2 => Stage::Household,
            3 => Stage::Forward,
            v if v >= APPLY_BASE => OperationKind::from_u8(v - APPLY_BASE)
                .map(Stage::Apply)
                .unwrap_or(Stage::Idle),
            _ => Stage::Idle,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Idle => f.write_str("idle"),
            Stage::Acquire => f.write_str("acquire"),
            Stage::Household => f.write_str("household"),
            Stage::Apply(op) => write!(f, "apply({op})"),
            Stage::Forward => f.write_str("forward"),
        }
    }
}

/// Returned by stage checkpoints once the worker has been aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Aborted;

/// State shared between the worker thread and its handle.
pub(crate) struct Shared {
    index: usize,
    name: Arc<str>,
    counter: AtomicU64,
    state: AtomicU8,
    stage: AtomicU8,
    stop: CancellationToken,
    abort: CancellationToken,
    trace: Mutex<String>,
}

impl Shared {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            name: Arc::from(format!("worker-{index}")),
            counter: AtomicU64::new(0),
            state: AtomicU8::new(WorkerState::Running as u8),
            stage: AtomicU8::new(Stage::Idle.as_u8()),
            stop: CancellationToken::new(),
            abort: CancellationToken::new(),
            trace: Mutex::new(String::new()),
        }
    }

    /// Records the new stage, failing if an abort is pending.
    pub(crate) fn enter(&self, stage: Stage) -> Result<(), Aborted> {
        self.checkpoint()?;
        self.stage.store(stage.as_u8(), Ordering::Relaxed);
        Ok(())
    }

    fn checkpoint(&self) -> Result<(), Aborted> {
        if !self.abort.is_cancelled() {
            return Ok(());
        }
        let bt = Backtrace::capture();
        if bt.status() == BacktraceStatus::Captured {
            let mut trace = self.trace.lock().unwrap_or_else(PoisonError::into_inner);
            trace.push_str("\nobserved abort at:\n");
            trace.push_str(&bt.to_string());
        }
        Err(Aborted)
    }

    #[cfg(test)]
    pub(crate) fn cancel_abort(&self) {
        self.abort.cancel();
    }

    fn stage(&self) -> Stage {
        Stage::from_u8(self.stage.load(Ordering::Relaxed))
    }

    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves to `Aborted` and records where the worker was.
    ///
    /// Returns `false` if the worker was already aborted or had exited.
    fn mark_aborted(&self) -> bool {
        let taken = self.transition(WorkerState::Running, WorkerState::Aborted)
            || self.transition(WorkerState::StopRequested, WorkerState::Aborted);
        if taken {
            let mut trace = self.trace.lock().unwrap_or_else(PoisonError::into_inner);
            *trace = format!(
                "{} aborted at iteration {} during {}",
                self.name,
                self.counter.load(Ordering::Acquire),
                self.stage()
            );
        }
        taken
    }

    /// Records a panic that escaped the iteration loop.
    fn mark_panicked(&self, info: &str) {
        let line = format!(
            "{} panicked at iteration {} during {}: {info}",
            self.name,
            self.counter.load(Ordering::Acquire),
            self.stage()
        );
        let fresh = self.transition(WorkerState::Running, WorkerState::Aborted)
            || self.transition(WorkerState::StopRequested, WorkerState::Aborted);
        let mut trace = self.trace.lock().unwrap_or_else(PoisonError::into_inner);
        if fresh || trace.is_empty() {
            *trace = line;
        } else {
            trace.push('\n');
            trace.push_str(&line);
        }
    }

    fn trace(&self) -> String {
        self.trace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Runs on the worker thread when it exits, normally or by unwinding.
struct ExitGuard {
    shared: Arc<Shared>,
    tx: Option<oneshot::Sender<()>>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        let _ = self.shared.transition(WorkerState::Running, WorkerState::Stopped)
            || self
                .shared
                .transition(WorkerState::StopRequested, WorkerState::Stopped);
        self.shared.stage.store(Stage::Idle.as_u8(), Ordering::Relaxed);
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Handle to one worker thread.
pub struct Worker {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
    exited: Option<oneshot::Receiver<()>>,
}

impl Worker {
    /// Spawns worker `index`, seeding its RNG with `seed`.
    ///
    /// ### Errors
    /// - [`RuntimeError::InvalidConfig`] if `cfg` fails validation;
    /// - [`RuntimeError::Spawn`] if the OS refuses the thread.
    pub fn spawn<W: Workload>(
        index: usize,
        workload: Arc<W>,
        pool: Arc<ArtifactPool<W::Artifact>>,
        cfg: Arc<WorkerConfig>,
        seed: u64,
    ) -> Result<Self, RuntimeError> {
        cfg.validate()?;
        let selector = OperationSelector::new(&cfg.weights)?;
        let shared = Arc::new(Shared::new(index));
        let (tx, rx) = oneshot::channel();

        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name(shared.name.to_string())
            .spawn(move || {
                let guard = ExitGuard {
                    shared: thread_shared,
                    tx: Some(tx),
                };
                let run = panic::catch_unwind(AssertUnwindSafe(|| {
                    worker_loop(&guard.shared, &*workload, &pool, &cfg, &selector, seed)
                }));
                if let Err(payload) = run {
                    guard.shared.mark_panicked(&panic_message(&*payload));
                }
            })
            .map_err(|source| RuntimeError::Spawn {
                worker: shared.name.to_string(),
                source,
            })?;

        Ok(Self {
            shared,
            thread: Some(thread),
            exited: Some(rx),
        })
    }

    pub fn index(&self) -> usize {
        self.shared.index
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Completed iterations so far.
    pub fn counter(&self) -> u64 {
        self.shared.counter.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Captured termination trace; empty unless the worker was aborted.
    pub fn trace(&self) -> String {
        self.shared.trace()
    }

    /// Asks the worker to exit at the top of its next iteration.
    ///
    /// No effect on a worker that is aborted or already stopped.
    pub fn request_stop(&self) {
        self.shared
            .transition(WorkerState::Running, WorkerState::StopRequested);
        self.shared.stop.cancel();
    }

    /// Forcibly aborts the worker, capturing where it was.
    ///
    /// Returns `false` if the worker was already aborted or had exited.
    /// The iteration number in the trace is read at this call; see the
    /// module rules for the one case where the final counter differs.
    pub fn abort(&self) -> bool {
        if !self.shared.mark_aborted() {
            return false;
        }
        self.shared.abort.cancel();
        true
    }

    /// Waits until the worker thread has fully exited.
    pub async fn join(mut self) -> WorkerExit {
        if let Some(rx) = self.exited.take() {
            let _ = rx.await;
        }
        self.reap().await;
        self.exit(false)
    }

    /// Waits for the worker thread until `deadline`; detaches it after that.
    pub async fn join_until(mut self, deadline: Instant) -> WorkerExit {
        let exited = match self.exited.take() {
            Some(rx) => tokio::time::timeout_at(deadline, rx).await.is_ok(),
            None => true,
        };
        if exited {
            self.reap().await;
            self.exit(false)
        } else {
            // Dropping the JoinHandle detaches the thread.
            self.thread.take();
            self.exit(true)
        }
    }

    async fn reap(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }
    }

    fn exit(&self, detached: bool) -> WorkerExit {
        WorkerExit {
            index: self.shared.index,
            name: Arc::clone(&self.shared.name),
            state: self.state(),
            iterations: self.counter(),
            trace: self.trace(),
            detached,
        }
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("counter", &self.counter())
            .finish()
    }
}

fn worker_loop<W: Workload>(
    shared: &Shared,
    workload: &W,
    pool: &ArtifactPool<W::Artifact>,
    cfg: &WorkerConfig,
    selector: &OperationSelector,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let it = Iteration {
        workload,
        pool,
        cfg,
        selector,
        probe: shared,
    };

    while !shared.stop.is_cancelled() && !shared.abort.is_cancelled() {
        if runner::run_iteration(&it, &mut rng).is_err() {
            return;
        }
        shared.counter.fetch_add(1, Ordering::Release);
    }
}

/// Final report for one worker.
#[derive(Debug, Clone)]
pub struct WorkerExit {
    pub index: usize,
    pub name: Arc<str>,
    /// State observed at join time.
    pub state: WorkerState,
    pub iterations: u64,
    /// Captured trace; empty for clean stops. The iteration it names is a
    /// snapshot from the moment of abort.
    pub trace: String,
    /// The thread was still running at the grace deadline and was left behind.
    pub detached: bool,
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} state={} iterations={}",
            self.name, self.state, self.iterations
        )?;
        if self.detached {
            f.write_str(" detached")?;
        }
        write!(f, " trace={:?}", self.trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_roundtrips_through_its_byte() {
        let stages = [
            Stage::Idle,
            Stage::Acquire,
            Stage::Household,
            Stage::Forward,
            Stage::Apply(OperationKind::Blur),
            Stage::Apply(OperationKind::RegionMask),
        ];
        for s in stages {
            assert_eq!(Stage::from_u8(s.as_u8()), s);
        }
        assert_eq!(Stage::Apply(OperationKind::Pad).to_string(), "apply(pad)");
    }

    #[test]
    fn abort_wins_only_once() {
        let shared = Shared::new(7);
        assert!(shared.transition(WorkerState::Running, WorkerState::Aborted));
        assert!(!shared.transition(WorkerState::Running, WorkerState::Stopped));
        assert_eq!(shared.state(), WorkerState::Aborted);
        assert!(shared.state().is_terminal());
    }

    #[test]
    fn checkpoint_fails_after_abort() {
        let shared = Shared::new(0);
        assert_eq!(shared.enter(Stage::Acquire), Ok(()));
        assert_eq!(shared.stage(), Stage::Acquire);
        shared.abort.cancel();
        assert_eq!(shared.enter(Stage::Forward), Err(Aborted));
        assert_eq!(shared.stage(), Stage::Acquire);
    }

    #[test]
    fn abort_trace_is_a_snapshot_of_the_counter() {
        let shared = Shared::new(4);
        shared.counter.store(5, Ordering::Release);
        shared.stage.store(Stage::Idle.as_u8(), Ordering::Relaxed);
        assert!(shared.mark_aborted());
        assert!(!shared.mark_aborted());

        // The worker finished iteration 5 right after the abort landed.
        shared.counter.fetch_add(1, Ordering::Release);
        assert_eq!(shared.trace(), "worker-4 aborted at iteration 5 during idle");
        assert_eq!(shared.counter.load(Ordering::Acquire), 6);
    }

    #[test]
    fn panic_after_abort_is_appended() {
        let shared = Shared::new(1);
        shared.stage.store(Stage::Household.as_u8(), Ordering::Relaxed);
        assert!(shared.mark_aborted());
        shared.mark_panicked("boom");
        assert_eq!(
            shared.trace(),
            "worker-1 aborted at iteration 0 during household\n\
             worker-1 panicked at iteration 0 during household: boom"
        );
        assert_eq!(shared.state(), WorkerState::Aborted);
    }

    #[test]
    fn exit_line_mentions_detach() {
        let exit = WorkerExit {
            index: 2,
            name: Arc::from("worker-2"),
            state: WorkerState::Aborted,
            iterations: 9,
            trace: "worker-2 aborted at iteration 9 during apply(blur)".into(),
            detached: true,
        };
        assert_eq!(
            exit.to_string(),
            "worker-2 state=aborted iterations=9 detached \
             trace=\"worker-2 aborted at iteration 9 during apply(blur)\""
        );
    }
}
