//! Runtime core: workers, watchdog, and orchestration.
//!
//! Public surface: [`Supervisor`], [`SupervisorBuilder`], [`Worker`],
//! [`HangWatchdog`] and their report types.
//!
//! Internal modules:
//! - [`runner`]: one worker iteration, stage by stage;
//! - [`worker`]: worker thread, state machine, stop/abort/join;
//! - [`watchdog`]: per-worker progress ages;
//! - [`supervisor`]: polling loop, hang decision, shutdown with grace;
//! - [`shutdown`]: OS termination signals.

mod builder;
mod runner;
mod shutdown;
mod supervisor;
mod watchdog;
mod worker;

pub use builder::SupervisorBuilder;
pub use supervisor::{RunReport, StopReason, Supervisor};
pub use watchdog::{HangWatchdog, Summary};
pub use worker::{Worker, WorkerExit, WorkerState};
