//! # One worker iteration.
//!
//! ```text
//! Acquire    make (p_making) or pop from pool (may be none)
//! Household  duplicate (original abandoned) | dispose → none | keep
//! Apply      pick op, maybe in-place, call workload; failure → no output
//! Forward    return to pool (p_return) | dispose (p_dispose) | abandon
//! ```
//!
//! ## Rules
//! - Every stage boundary is an abort checkpoint. On abort the iteration
//!   returns early and whatever artifact it holds is dropped without dispose,
//!   never pushed.
//! - Operation failures and panics are swallowed; the iteration still completes.
//!   That covers `create`, `apply`, `duplicate`, `dispose` and the overflow
//!   disposal inside `push`.
//! - A missing artifact makes the remaining stages no-ops.

use std::panic::{self, AssertUnwindSafe};

use rand::Rng;
use rand::rngs::StdRng;

use crate::config::WorkerConfig;
use crate::core::worker::{Aborted, Shared, Stage};
use crate::error::OperationError;
use crate::policies::{Disposal, Household, OperationSelector, Source};
use crate::pool::ArtifactPool;
use crate::subscribers::panic_message;
use crate::workload::{Artifact, Format, Invocation, Workload};

/// Everything an iteration borrows from its worker.
pub(crate) struct Iteration<'a, W: Workload> {
    pub workload: &'a W,
    pub pool: &'a ArtifactPool<W::Artifact>,
    pub cfg: &'a WorkerConfig,
    pub selector: &'a OperationSelector,
    pub probe: &'a Shared,
}

/// Runs one iteration. `Err` means the worker was aborted mid-way.
pub(crate) fn run_iteration<W: Workload>(
    it: &Iteration<'_, W>,
    rng: &mut StdRng,
) -> Result<(), Aborted> {
    it.probe.enter(Stage::Acquire)?;
    let acquired = match Source::decide(it.cfg, rng.random()) {
        Source::Make => make(it, rng),
        Source::Pool => it.pool.pop(),
    };

    it.probe.enter(Stage::Household)?;
    let current = acquired.and_then(|artifact| match Household::decide(it.cfg, rng.random()) {
        // The original is abandoned, not disposed.
        Household::Duplicate => guarded(|| Ok(artifact.duplicate())).ok(),
        Household::Discard => {
            quietly(|| artifact.dispose());
            None
        }
        Household::Keep => Some(artifact),
    });

    let output = match current {
        Some(artifact) => {
            let call = Invocation {
                op: it.selector.pick(rng.random()),
                inplace: rng.random::<f64>() < it.cfg.probability_of_inplace,
            };
            it.probe.enter(Stage::Apply(call.op))?;
            guarded(|| it.workload.apply(call, artifact, &mut *rng))
                .ok()
                .flatten()
        }
        None => None,
    };

    it.probe.enter(Stage::Forward)?;
    if let Some(out) = output {
        let first: f64 = rng.random();
        match Disposal::decide(it.cfg, first, || rng.random()) {
            Disposal::Return => quietly(|| {
                it.pool.push(out);
            }),
            Disposal::Dispose => quietly(|| out.dispose()),
            Disposal::Abandon => quietly(|| drop(out)),
        }
    }

    it.probe.enter(Stage::Idle)
}

fn make<W: Workload>(it: &Iteration<'_, W>, rng: &mut StdRng) -> Option<W::Artifact> {
    let max = it.cfg.max_dimension.max(1);
    let width = rng.random_range(1..=max);
    let height = rng.random_range(1..=max);
    let format = Format::ALL[rng.random_range(0..Format::ALL.len())];
    guarded(|| it.workload.create(width, height, format)).ok()
}

/// Calls into the workload, turning a panic into [`OperationError::Panicked`].
fn guarded<T>(call: impl FnOnce() -> Result<T, OperationError>) -> Result<T, OperationError> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        Err(OperationError::Panicked {
            info: panic_message(&*payload),
        })
    })
}

/// Runs an artifact release step, swallowing a panic like a failed operation.
fn quietly(call: impl FnOnce()) {
    let _ = guarded(|| {
        call();
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::OperationKind;
    use crate::workload::synthetic::SyntheticWorkload;
    use rand::SeedableRng;

    fn shared() -> Shared {
        Shared::new(0)
    }

    #[test]
    fn panics_become_operation_errors() {
        let r: Result<(), _> = guarded(|| panic!("kaboom"));
        assert_eq!(
            r,
            Err(OperationError::Panicked {
                info: "kaboom".into()
            })
        );
    }

    #[test]
    fn always_make_always_return_fills_the_pool() {
        let workload = SyntheticWorkload::new();
        let pool = ArtifactPool::new(4);
        let cfg = WorkerConfig {
            probability_of_making: 1.0,
            probability_of_duplicate: 0.0,
            probability_of_discard: 0.0,
            probability_of_return: 1.0,
            max_dimension: 8,
            weights: vec![(OperationKind::Pad, 1.0)],
            ..WorkerConfig::default()
        };
        let selector = OperationSelector::new(&cfg.weights).unwrap();
        let probe = shared();
        let it = Iteration {
            workload: &workload,
            pool: &pool,
            cfg: &cfg,
            selector: &selector,
            probe: &probe,
        };
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..6 {
            assert_eq!(run_iteration(&it, &mut rng), Ok(()));
        }
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.overflowed(), 2);
        let stats = workload.stats().snapshot();
        assert_eq!(stats.created, 12);
        assert_eq!(stats.disposed, 8);
    }

    /// Artifact whose release paths all panic.
    struct Brittle;

    impl Artifact for Brittle {
        fn duplicate(&self) -> Self {
            panic!("duplicate failed")
        }

        fn dispose(self) {
            panic!("dispose failed")
        }
    }

    struct BrittleWorkload;

    impl Workload for BrittleWorkload {
        type Artifact = Brittle;

        fn create(&self, _: u32, _: u32, _: Format) -> Result<Brittle, OperationError> {
            Ok(Brittle)
        }

        fn apply(
            &self,
            _: Invocation,
            input: Brittle,
            _: &mut StdRng,
        ) -> Result<Option<Brittle>, OperationError> {
            Ok(Some(input))
        }
    }

    fn brittle_run(cfg: WorkerConfig, pool: &ArtifactPool<Brittle>) {
        let selector = OperationSelector::default();
        let probe = shared();
        let it = Iteration {
            workload: &BrittleWorkload,
            pool,
            cfg: &cfg,
            selector: &selector,
            probe: &probe,
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..4 {
            assert_eq!(run_iteration(&it, &mut rng), Ok(()));
        }
    }

    #[test]
    fn panicking_duplicate_is_swallowed() {
        let pool = ArtifactPool::new(4);
        brittle_run(
            WorkerConfig {
                probability_of_making: 1.0,
                probability_of_duplicate: 1.0,
                probability_of_discard: 0.0,
                probability_of_return: 1.0,
                ..WorkerConfig::default()
            },
            &pool,
        );
        assert!(pool.is_empty());
    }

    #[test]
    fn panicking_dispose_is_swallowed() {
        let pool = ArtifactPool::new(1);
        brittle_run(
            WorkerConfig {
                probability_of_making: 1.0,
                probability_of_duplicate: 0.0,
                probability_of_discard: 0.0,
                probability_of_return: 1.0,
                ..WorkerConfig::default()
            },
            &pool,
        );
        // One queued, the other three overflowed into a panicking dispose.
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.overflowed(), 3);
    }

    #[test]
    fn aborted_iteration_never_pushes() {
        let workload = SyntheticWorkload::new();
        let pool = ArtifactPool::new(4);
        let cfg = WorkerConfig {
            probability_of_making: 1.0,
            probability_of_return: 1.0,
            ..WorkerConfig::default()
        };
        let selector = OperationSelector::default();
        let probe = shared();
        let it = Iteration {
            workload: &workload,
            pool: &pool,
            cfg: &cfg,
            selector: &selector,
            probe: &probe,
        };
        probe.cancel_abort();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(run_iteration(&it, &mut rng), Err(Aborted));
        assert!(pool.is_empty());
        assert_eq!(workload.stats().snapshot().created, 0);
    }
}
