//! # Weighted operation selection.
//!
//! [`OperationSelector`] turns a table of relative weights into a normalized
//! cumulative distribution and maps a uniform sample onto it (inverse-CDF).
//!
//! ```text
//! weights     [1,    1,    1,    1   ]
//! cumulative  [0.25, 0.50, 0.75, 1.00]
//!
//! select(s) = first i with cumulative[i] > s   (strict)
//!             last index if none qualifies (rounding at the top end)
//! ```
//!
//! The comparison is strict so that a zero-weight entry, whose cumulative value
//! equals its predecessor's, can never be hit by a sample sitting exactly on
//! that boundary.
//!
//! # Example
//! ```rust
//! use stressvisor::{OperationKind, OperationSelector};
//!
//! let sel = OperationSelector::uniform();
//! assert_eq!(sel.select(0.0), 0);
//! assert_eq!(sel.select(0.25), 1);
//! assert_eq!(sel.pick(0.99), OperationKind::RegionMask);
//! ```

use crate::error::ConfigError;
use crate::workload::OperationKind;

/// Immutable inverse-CDF table over operation kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSelector {
    kinds: Vec<OperationKind>,
    cumulative: Vec<f64>,
}

impl OperationSelector {
    /// Builds a selector from `(kind, relative weight)` pairs.
    ///
    /// ### Errors
    /// - [`ConfigError::EmptyWeights`] for an empty table;
    /// - [`ConfigError::InvalidWeight`] for a negative or non-finite weight;
    /// - [`ConfigError::ZeroTotalWeight`] when nothing could ever be selected.
    pub fn new(weights: &[(OperationKind, f64)]) -> Result<Self, ConfigError> {
        if weights.is_empty() {
            return Err(ConfigError::EmptyWeights);
        }
        let mut kinds = Vec::with_capacity(weights.len());
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut sum = 0.0;
        for &(kind, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight { kind, weight });
            }
            sum += weight;
            kinds.push(kind);
            cumulative.push(sum);
        }
        if sum <= 0.0 || !sum.is_finite() {
            return Err(ConfigError::ZeroTotalWeight);
        }
        let inv = 1.0 / sum;
        for c in &mut cumulative {
            *c *= inv;
        }
        Ok(Self { kinds, cumulative })
    }

    /// Equal weight for every [`OperationKind`].
    pub fn uniform() -> Self {
        let n = OperationKind::ALL.len() as f64;
        Self {
            kinds: OperationKind::ALL.to_vec(),
            cumulative: (1..=OperationKind::ALL.len()).map(|i| i as f64 / n).collect(),
        }
    }

    /// Maps a uniform sample in `[0, 1)` to a table index.
    pub fn select(&self, sample: f64) -> usize {
        self.cumulative
            .iter()
            .position(|&c| c > sample)
            .unwrap_or(self.cumulative.len() - 1)
    }

    /// Same as [`select`](Self::select) but returns the operation kind.
    pub fn pick(&self, sample: f64) -> OperationKind {
        self.kinds[self.select(sample)]
    }

    /// Normalized cumulative distribution (last value is 1.0).
    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Always false: construction rejects empty tables.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for OperationSelector {
    fn default() -> Self {
        Self::uniform()
    }
}
