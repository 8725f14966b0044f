#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use stressvisor::{Artifact, Config, Format, Invocation, OperationError, Workload};

/// Tiny artifact: just an id.
#[derive(Debug, PartialEq, Eq)]
pub struct Chip(pub u64);

impl Artifact for Chip {
    fn duplicate(&self) -> Self {
        Chip(self.0)
    }
}

/// Instant operations; never fails.
#[derive(Default)]
pub struct ChipWorkload {
    next: AtomicU64,
}

impl Workload for ChipWorkload {
    type Artifact = Chip;

    fn create(&self, _: u32, _: u32, _: Format) -> Result<Chip, OperationError> {
        Ok(Chip(self.next.fetch_add(1, Ordering::Relaxed)))
    }

    fn apply(
        &self,
        _: Invocation,
        input: Chip,
        _: &mut StdRng,
    ) -> Result<Option<Chip>, OperationError> {
        Ok(Some(input))
    }
}

/// Wraps a workload so the thread named `victim` blocks inside `apply`
/// until [`Hanging::release`] is called.
pub struct Hanging<W = ChipWorkload> {
    victim: &'static str,
    inner: W,
    entered: AtomicBool,
    released: AtomicBool,
}

impl Hanging<ChipWorkload> {
    pub fn new(victim: &'static str) -> Self {
        Self::wrap(victim, ChipWorkload::default())
    }
}

impl<W: Workload> Hanging<W> {
    pub fn wrap(victim: &'static str, inner: W) -> Self {
        Self {
            victim,
            inner,
            entered: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }

    /// True once the victim is stuck.
    pub fn entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

impl<W: Workload> Workload for Hanging<W> {
    type Artifact = W::Artifact;

    fn create(&self, w: u32, h: u32, f: Format) -> Result<W::Artifact, OperationError> {
        self.inner.create(w, h, f)
    }

    fn apply(
        &self,
        call: Invocation,
        input: W::Artifact,
        rng: &mut StdRng,
    ) -> Result<Option<W::Artifact>, OperationError> {
        if std::thread::current().name() == Some(self.victim) {
            while !self.released.load(Ordering::SeqCst) {
                self.entered.store(true, Ordering::SeqCst);
                std::thread::park_timeout(Duration::from_millis(5));
            }
        }
        self.inner.apply(call, input, rng)
    }
}

/// Artifact that panics when an armed instance is dropped.
#[derive(Debug)]
pub struct Fuse {
    armed: bool,
}

impl Artifact for Fuse {
    fn duplicate(&self) -> Self {
        Fuse { armed: false }
    }

    fn dispose(mut self) {
        self.armed = false;
    }
}

impl Drop for Fuse {
    fn drop(&mut self) {
        if self.armed && !std::thread::panicking() {
            panic!("fuse blew");
        }
    }
}

/// Creates armed [`Fuse`]s; abandoning one kills the worker thread.
#[derive(Default)]
pub struct FuseWorkload;

impl Workload for FuseWorkload {
    type Artifact = Fuse;

    fn create(&self, _: u32, _: u32, _: Format) -> Result<Fuse, OperationError> {
        Ok(Fuse { armed: true })
    }

    fn apply(
        &self,
        _: Invocation,
        input: Fuse,
        _: &mut StdRng,
    ) -> Result<Option<Fuse>, OperationError> {
        Ok(Some(input))
    }
}

/// Fast polling, every iteration creates a fresh artifact, no OS signals.
pub fn quick_config(workers: usize) -> Config {
    let mut cfg = Config {
        workers,
        poll_interval: Duration::from_millis(20),
        hang_limit: Duration::from_millis(300),
        grace: Duration::from_millis(200),
        handle_os_signals: false,
        ..Config::default()
    };
    cfg.worker.probability_of_making = 1.0;
    cfg.worker.probability_of_duplicate = 0.0;
    cfg.worker.probability_of_discard = 0.0;
    cfg.worker.max_dimension = 4;
    cfg
}

/// Polls `cond` every 5ms for up to 5s.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..1000 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
