//! # Global runtime configuration.
//!
//! Provides [`Config`] (supervisor settings) and [`WorkerConfig`] (the
//! immutable probability table every worker shares).
//!
//! ## Sentinel values
//! - `workers = 0` → one worker per available CPU
//! - `pool_multiplier = 0` → treated as 1 (pool never has zero capacity)
//! - `grace = 0s` → do not wait for workers after stop; detach stragglers
//!
//! Nothing here is read from the environment: build a `Config`, adjust fields,
//! hand it to the supervisor.

use std::time::Duration;

use crate::error::ConfigError;
use crate::workload::OperationKind;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `workers`: Number of worker threads (`0` = available parallelism)
/// - `poll_interval`: Watchdog sampling period
/// - `hang_limit`: Age after which a worker is declared hung and aborted
/// - `pool_multiplier`: Pool capacity = `pool_multiplier × workers`
/// - `grace`: Deadline for workers to exit after stop is requested
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `seed`: Worker `i` seeds its RNG with `seed + i`
/// - `handle_os_signals`: End the polling loop on SIGINT/SIGTERM/SIGQUIT (Ctrl-C)
/// - `worker`: Per-iteration probabilities and operation weights
#[derive(Clone, Debug)]
pub struct Config {
    pub workers: usize,
    pub poll_interval: Duration,
    pub hang_limit: Duration,
    pub pool_multiplier: usize,

    /// Maximum time to wait for workers to exit once stop is requested.
    ///
    /// Workers still running at the deadline are detached (left running,
    /// reported with `detached = true`); Rust offers no safe way to kill them.
    pub grace: Duration,

    pub bus_capacity: usize,
    pub seed: u64,
    pub handle_os_signals: bool,
    pub worker: WorkerConfig,
}

impl Config {
    /// Resolves the `workers = 0` sentinel.
    pub fn worker_count(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    /// Capacity of the shared artifact pool for `workers` workers.
    #[inline]
    pub fn pool_capacity(&self, workers: usize) -> usize {
        self.pool_multiplier.max(1).saturating_mul(workers).max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Checks every knob; called by the supervisor before spawning anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        self.worker.validate()
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `workers = 0` (available parallelism)
    /// - `poll_interval = 1s`, `hang_limit = 200s`
    /// - `pool_multiplier = 2`
    /// - `grace = 10s`
    /// - `bus_capacity = 1024`
    /// - `seed = 1234`
    /// - `handle_os_signals = true`
    fn default() -> Self {
        Self {
            workers: 0,
            poll_interval: Duration::from_secs(1),
            hang_limit: Duration::from_secs(200),
            pool_multiplier: 2,
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
            seed: 1234,
            handle_os_signals: true,
            worker: WorkerConfig::default(),
        }
    }
}

/// Immutable per-iteration probability table, shared by all workers.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerConfig {
    /// Chance of creating a new artifact instead of popping one.
    pub probability_of_making: f64,
    /// Chance of asking for the in-place variant of an operation.
    pub probability_of_inplace: f64,
    /// Chance of duplicating the acquired artifact (original abandoned).
    pub probability_of_duplicate: f64,
    /// Chance (after duplicate) of disposing the acquired artifact up front.
    pub probability_of_discard: f64,
    /// Chance of returning the output to the pool.
    pub probability_of_return: f64,
    /// Chance, when not returned, of disposing rather than abandoning.
    pub probability_of_dispose: f64,
    /// Upper bound for width and height of created artifacts.
    pub max_dimension: u32,
    /// Relative weights of each operation kind.
    pub weights: Vec<(OperationKind, f64)>,
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let knobs = [
            ("probability_of_making", self.probability_of_making),
            ("probability_of_inplace", self.probability_of_inplace),
            ("probability_of_duplicate", self.probability_of_duplicate),
            ("probability_of_discard", self.probability_of_discard),
            ("probability_of_return", self.probability_of_return),
            ("probability_of_dispose", self.probability_of_dispose),
        ];
        for (name, value) in knobs {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }
        let household = self.probability_of_duplicate + self.probability_of_discard;
        if household > 1.0 {
            return Err(ConfigError::Probability {
                name: "probability_of_duplicate + probability_of_discard",
                value: household,
            });
        }
        if self.max_dimension == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        crate::policies::OperationSelector::new(&self.weights).map(|_| ())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            probability_of_making: 0.2,
            probability_of_inplace: 0.1,
            probability_of_duplicate: 0.1,
            probability_of_discard: 0.1,
            probability_of_return: 0.85,
            probability_of_dispose: 0.8,
            max_dimension: 2048,
            weights: OperationKind::ALL.iter().map(|&k| (k, 1.0)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn pool_capacity_is_twice_the_workers() {
        let cfg = Config::default();
        assert_eq!(cfg.pool_capacity(8), 16);
        let cfg = Config { pool_multiplier: 0, ..Config::default() };
        assert_eq!(cfg.pool_capacity(3), 3);
        assert_eq!(cfg.pool_capacity(0), 1);
    }

    #[test]
    fn worker_count_resolves_sentinel() {
        let cfg = Config::default();
        assert!(cfg.worker_count() >= 1);
        let cfg = Config { workers: 3, ..Config::default() };
        assert_eq!(cfg.worker_count(), 3);
    }

    #[test]
    fn rejects_bad_knobs() {
        let mut cfg = Config::default();
        cfg.worker.probability_of_return = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Probability { name: "probability_of_return", .. })
        ));

        let mut cfg = Config::default();
        cfg.worker.probability_of_making = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.poll_interval = Duration::ZERO;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroPollInterval));

        let mut cfg = Config::default();
        cfg.worker.weights.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyWeights));

        let mut cfg = Config::default();
        cfg.worker.probability_of_duplicate = 0.6;
        cfg.worker.probability_of_discard = 0.6;
        assert!(cfg.validate().is_err());
    }
}
