//! # stressvisor
//!
//! **Stressvisor** is a concurrency stress harness. A fixed set of worker
//! threads keeps creating, mutating, recycling and destroying artifacts
//! through a bounded shared pool, while a watchdog samples per-worker progress
//! counters and aborts any worker that stops making progress.
//!
//! ## Architecture
//! ```text
//!        ┌──────────────────────────────────────────────────────────────┐
//!        │  Supervisor (tokio)                                          │
//!        │  - HangWatchdog (per-worker last-change timestamps)          │
//!        │  - Bus (broadcast events) ─► SubscriberSet ─► LogWriter ...  │
//!        └──────┬──────────────────────┬──────────────────────┬─────────┘
//!      counter  │ stop / abort         │                      │
//!               ▼                      ▼                      ▼
//!        ┌─────────────┐        ┌─────────────┐        ┌─────────────┐
//!        │  worker-0   │        │  worker-1   │        │  worker-N   │
//!        │ (OS thread) │        │ (OS thread) │        │ (OS thread) │
//!        └──────┬──────┘        └──────┬──────┘        └──────┬──────┘
//!               │ push / pop           │                      │
//!               ▼                      ▼                      ▼
//!        ┌──────────────────────────────────────────────────────────────┐
//!        │  ArtifactPool (lock-free, bounded, drops the pushed item     │
//!        │  when full)                                                  │
//!        └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Iteration
//! ```text
//! acquire ─► household ─► apply(op) ─► forward ─► counter += 1
//! (make|pop)  (dup|discard|keep)        (return|dispose|abandon)
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                        |
//! |-------------------|-------------------------------------------------------------|-------------------------------------------|
//! | **Workload**      | Opaque artifacts and operations the workers drive.          | [`Workload`], [`Artifact`]                |
//! | **Pool**          | Bounded MPMC artifact queue with lossy overflow.            | [`ArtifactPool`]                          |
//! | **Selection**     | Weighted operation choice and per-iteration coin flips.     | [`OperationSelector`], [`Household`]      |
//! | **Supervision**   | Workers, hang detection, stop/abort, grace shutdown.        | [`Supervisor`], [`Worker`], [`HangWatchdog`] |
//! | **Subscriber API**| Observe the run (status lines, hangs, termination report).  | [`Subscribe`], [`Event`]                  |
//! | **Errors**        | Typed errors for config, runtime and operations.            | [`RuntimeError`], [`ConfigError`]         |
//!
//! ## Optional features
//! - `logging` (default): exports the console [`LogWriter`].
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use stressvisor::{Config, LogWriter, Subscribe, SupervisorBuilder, SyntheticWorkload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let workload = Arc::new(SyntheticWorkload::new());
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let sup = SupervisorBuilder::new(Config::default(), workload.clone())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     // Runs until Ctrl-C or until a worker hangs.
//!     let report = sup.run().await?;
//!     println!("{report}");
//!     println!("{}", workload.stats().snapshot());
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod policies;
mod pool;
mod subscribers;
mod workload;

// ---- Public re-exports ----

pub use config::{Config, WorkerConfig};
pub use crate::core::{
    HangWatchdog, RunReport, StopReason, Summary, Supervisor, SupervisorBuilder, Worker,
    WorkerExit, WorkerState,
};
pub use error::{ConfigError, OperationError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use policies::{Disposal, Household, OperationSelector, Source};
pub use pool::{ArtifactPool, Push};
pub use subscribers::{Subscribe, SubscriberSet};
pub use workload::synthetic::{Image, StatsSnapshot, SyntheticWorkload, WorkloadStats};
pub use workload::{Artifact, Format, Invocation, OperationKind, Workload};

// Optional: console logger subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
