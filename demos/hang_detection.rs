//! # Example: hang_detection
//!
//! One worker gets stuck inside an operation; the watchdog notices, aborts
//! only that worker, and the others stop cleanly.
//!
//! Shows how to:
//! - Wrap a [`Workload`] to inject a hang.
//! - Tune `poll_interval`, `hang_limit` and `grace` for a short run.
//! - Read the aborted worker's trace from the [`RunReport`](stressvisor::RunReport).
//!
//! ## Flow
//! ```text
//! worker-1 ─► apply(blur) ─► park forever
//! watchdog ─► age(worker-1) > 3s ─► [hang] worker-1 ... ─► abort(worker-1)
//! supervisor ─► request_stop(all) ─► join (grace 2s)
//!     ├─► worker-0, worker-2, worker-3 ─► [stopped] ... trace=""
//!     └─► worker-1 still parked ─► [detached] ... trace="worker-1 aborted ... during apply(blur)"
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example hang_detection
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use rand::rngs::StdRng;
use stressvisor::{
    Config, Format, Image, Invocation, LogWriter, OperationError, OperationKind, Subscribe,
    SupervisorBuilder, SyntheticWorkload, Workload,
};

/// Delegates to [`SyntheticWorkload`] but parks `worker-1` on its first blur.
struct Stuck {
    inner: SyntheticWorkload,
    tripped: AtomicBool,
}

impl Workload for Stuck {
    type Artifact = Image;

    fn create(&self, width: u32, height: u32, format: Format) -> Result<Image, OperationError> {
        self.inner.create(width, height, format)
    }

    fn apply(
        &self,
        call: Invocation,
        input: Image,
        rng: &mut StdRng,
    ) -> Result<Option<Image>, OperationError> {
        let me = std::thread::current();
        if call.op == OperationKind::Blur
            && me.name() == Some("worker-1")
            && !self.tripped.swap(true, Ordering::SeqCst)
        {
            loop {
                std::thread::park();
            }
        }
        self.inner.apply(call, input, rng)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cfg = Config {
        workers: 4,
        poll_interval: Duration::from_millis(500),
        hang_limit: Duration::from_secs(3),
        grace: Duration::from_secs(2),
        ..Config::default()
    };
    cfg.worker.max_dimension = 256;
    let workload = Arc::new(Stuck {
        inner: SyntheticWorkload::new(),
        tripped: AtomicBool::new(false),
    });
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let sup = SupervisorBuilder::new(cfg, workload).with_subscribers(subs).build();
    let report = sup.run().await?;
    sup.close().await;

    println!("{report}");
    for exit in report.aborted() {
        println!("hung worker {} left behind: {}", exit.name, exit.detached);
    }
    Ok(())
}
