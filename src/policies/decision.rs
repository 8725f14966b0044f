//! # Per-iteration decisions.
//!
//! Each worker iteration makes three random choices. They are pure functions of
//! a [`WorkerConfig`] and uniform samples so they can be tested without an RNG.
//!
//! ```text
//! Source     sample < making                       → Make     else Pool
//! Household  sample < duplicate                    → Duplicate
//!            sample < duplicate + discard          → Discard  else Keep
//! Disposal   first  < return                       → Return
//!            second < dispose                      → Dispose  else Abandon
//! ```

use crate::config::WorkerConfig;

/// Where the next artifact comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Create a brand-new artifact.
    Make,
    /// Pop one from the shared pool (may be empty).
    Pool,
}

impl Source {
    pub fn decide(cfg: &WorkerConfig, sample: f64) -> Self {
        if sample < cfg.probability_of_making {
            Source::Make
        } else {
            Source::Pool
        }
    }
}

/// What to do with an acquired artifact before operating on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Household {
    /// Continue with a copy; the original is abandoned without dispose.
    Duplicate,
    /// Dispose it and continue with nothing.
    Discard,
    /// Leave it alone.
    Keep,
}

impl Household {
    pub fn decide(cfg: &WorkerConfig, sample: f64) -> Self {
        if sample < cfg.probability_of_duplicate {
            Household::Duplicate
        } else if sample < cfg.probability_of_duplicate + cfg.probability_of_discard {
            Household::Discard
        } else {
            Household::Keep
        }
    }
}

/// Fate of an operation's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposal {
    /// Push back into the pool for another worker.
    Return,
    /// Dispose explicitly.
    Dispose,
    /// Drop without dispose (simulated caller bug).
    Abandon,
}

impl Disposal {
    /// `second` is only consulted when `first` did not pick [`Disposal::Return`].
    pub fn decide(cfg: &WorkerConfig, first: f64, second: impl FnOnce() -> f64) -> Self {
        if first < cfg.probability_of_return {
            Disposal::Return
        } else if second() < cfg.probability_of_dispose {
            Disposal::Dispose
        } else {
            Disposal::Abandon
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_follows_probability_of_making() {
        let cfg = WorkerConfig::default();
        assert_eq!(Source::decide(&cfg, 0.0), Source::Make);
        assert_eq!(Source::decide(&cfg, 0.19), Source::Make);
        assert_eq!(Source::decide(&cfg, 0.2), Source::Pool);
    }

    #[test]
    fn household_bands() {
        let cfg = WorkerConfig::default();
        assert_eq!(Household::decide(&cfg, 0.05), Household::Duplicate);
        assert_eq!(Household::decide(&cfg, 0.1), Household::Discard);
        assert_eq!(Household::decide(&cfg, 0.19), Household::Discard);
        assert_eq!(Household::decide(&cfg, 0.2), Household::Keep);
        assert_eq!(Household::decide(&cfg, 0.99), Household::Keep);
    }

    #[test]
    fn disposal_only_draws_second_sample_when_needed() {
        let cfg = WorkerConfig::default();
        let d = Disposal::decide(&cfg, 0.5, || panic!("second sample drawn"));
        assert_eq!(d, Disposal::Return);
        assert_eq!(Disposal::decide(&cfg, 0.9, || 0.5), Disposal::Dispose);
        assert_eq!(Disposal::decide(&cfg, 0.9, || 0.8), Disposal::Abandon);
    }
}
