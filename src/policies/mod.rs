//! Selection and decision policies.
//!
//! This module groups the knobs that control **what** a worker does on each
//! iteration.
//!
//! ## Contents
//! - [`OperationSelector`] which operation to apply (weighted inverse-CDF)
//! - [`Source`], [`Household`], [`Disposal`] the three per-iteration coin flips
//!
//! ## Quick wiring
//! ```text
//! WorkerConfig { probabilities, weights }
//!      └─► core::worker builds one OperationSelector per worker and
//!          feeds uniform samples from its own StdRng into every decision
//! ```
//!
//! ## Defaults
//! - equal weights over blur / pad / convert / region-mask;
//! - make 0.2, duplicate 0.1, discard 0.1, return 0.85, dispose 0.8, in-place 0.1.

mod decision;
mod selector;

pub use decision::{Disposal, Household, Source};
pub use selector::OperationSelector;
