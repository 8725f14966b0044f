//! # Example: stress
//!
//! Runs the synthetic image workload on every CPU with the console logger.
//!
//! Shows how to:
//! - Build a [`Supervisor`] with [`SupervisorBuilder`] and a [`LogWriter`].
//! - Stop the run from outside with [`Supervisor::stop_handle`].
//! - Print the termination report and the workload's reclamation counters.
//!
//! ## Flow
//! ```text
//! SupervisorBuilder::build()
//!     └─► Supervisor::run()
//!           ├─► Worker::spawn(0..N)            [started] worker-i
//!           ├─► every second: refresh + summarize  [status] total ages...
//!           ├─► Ctrl-C / timer ─► stop          [shutdown-requested]
//!           └─► join with grace                 [stopped] worker-i ...
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example stress            # until Ctrl-C
//! cargo run --example stress -- 30      # stop after 30 seconds
//! ```

use std::{sync::Arc, time::Duration};

use stressvisor::{Config, LogWriter, Subscribe, SupervisorBuilder, SyntheticWorkload};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let seconds: Option<u64> = std::env::args().nth(1).map(|s| s.parse()).transpose()?;

    let cfg = Config {
        hang_limit: Duration::from_secs(30),
        ..Config::default()
    };
    let workload = Arc::new(SyntheticWorkload::new());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let sup = SupervisorBuilder::new(cfg, Arc::clone(&workload))
        .with_subscribers(subs)
        .build();

    if let Some(secs) = seconds {
        let stop = sup.stop_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            stop.cancel();
        });
    }

    let report = sup.run().await?;
    sup.close().await;

    println!("{report}");
    println!("artifacts: {}", workload.stats().snapshot());
    Ok(())
}
