//! # Workload abstractions.
//!
//! Workers do not know what an artifact is or what an operation does. They
//! talk to the outside world through two traits:
//! - [`Artifact`] - an owned, disposable resource (duplicate / dispose);
//! - [`Workload`] - creates artifacts and applies [`OperationKind`]s to them.
//!
//! [`synthetic`] provides a byte-buffer image workload so the harness can run
//! without external libraries.

mod operation;
pub mod synthetic;
mod workload;

pub use operation::{Format, Invocation, OperationKind};
pub use workload::{Artifact, Workload};
