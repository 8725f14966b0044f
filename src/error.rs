//! Error types used by the stressvisor runtime and workloads.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: errors raised by the supervisor itself (bad config, thread spawn).
//! - [`ConfigError`]: validation failures of [`Config`](crate::Config) and weight tables.
//! - [`OperationError`]: transient failures of a single workload operation.
//!
//! Each type provides `as_label()` for logs. Operation errors never leave a
//! worker: they are swallowed and the iteration counts as done without output.

use thiserror::Error;

use crate::workload::{Format, OperationKind};

/// # Errors produced by the stressvisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration was rejected before any worker started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The OS refused to start a worker thread.
    #[error("failed to spawn {worker}: {source}")]
    Spawn {
        /// Name of the worker that failed to start.
        worker: String,
        /// Underlying I/O error from `std::thread::Builder::spawn`.
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use stressvisor::{ConfigError, RuntimeError};
    ///
    /// let err = RuntimeError::from(ConfigError::EmptyWeights);
    /// assert_eq!(err.as_label(), "runtime_invalid_config");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidConfig(_) => "runtime_invalid_config",
            RuntimeError::Spawn { .. } => "runtime_spawn_failed",
        }
    }
}

/// # Configuration validation errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A probability knob is outside `[0, 1]` or not finite.
    #[error("probability `{name}` must be within [0, 1], got {value}")]
    Probability {
        /// Knob name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// The operation weight table has no entries.
    #[error("operation weight table is empty")]
    EmptyWeights,

    /// A weight is negative or not finite.
    #[error("weight for {kind} must be finite and non-negative, got {weight}")]
    InvalidWeight {
        /// Operation the weight belongs to.
        kind: OperationKind,
        /// Rejected weight.
        weight: f64,
    },

    /// All weights are zero, so no operation can ever be selected.
    #[error("operation weights sum to zero")]
    ZeroTotalWeight,

    /// Polling interval of zero would spin the control loop.
    #[error("poll interval must be non-zero")]
    ZeroPollInterval,

    /// `max_dimension` must allow at least a 1×1 artifact.
    #[error("max_dimension must be at least 1")]
    ZeroDimension,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Probability { .. } => "config_probability",
            ConfigError::EmptyWeights => "config_empty_weights",
            ConfigError::InvalidWeight { .. } => "config_invalid_weight",
            ConfigError::ZeroTotalWeight => "config_zero_total_weight",
            ConfigError::ZeroPollInterval => "config_zero_poll_interval",
            ConfigError::ZeroDimension => "config_zero_dimension",
        }
    }
}

/// # Transient failure of one workload operation.
///
/// Workers catch these, drop the (already consumed) input and carry on.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// The operation does not accept the artifact's format.
    #[error("{op} does not support {format}")]
    Unsupported {
        /// Operation that refused the input.
        op: OperationKind,
        /// Format of the rejected artifact.
        format: Format,
    },

    /// Arguments derived from the artifact are out of range.
    #[error("{op}: {detail}")]
    OutOfRange {
        /// Operation that failed.
        op: OperationKind,
        /// What was out of range.
        detail: String,
    },

    /// Creating a new artifact failed.
    #[error("create failed: {detail}")]
    Create {
        /// Reason reported by the workload.
        detail: String,
    },

    /// The operation panicked; the panic was caught at the worker boundary.
    #[error("operation panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl OperationError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            OperationError::Unsupported { .. } => "op_unsupported",
            OperationError::OutOfRange { .. } => "op_out_of_range",
            OperationError::Create { .. } => "op_create_failed",
            OperationError::Panicked { .. } => "op_panicked",
        }
    }
}
