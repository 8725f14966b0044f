//! # SupervisorBuilder
//!
//! Assembles a [`Supervisor`]: creates the bus sized by
//! [`Config::bus_capacity_clamped`] and spawns one worker task per subscriber.
//!
//! ```no_run
//! use std::sync::Arc;
//! use stressvisor::{Config, LogWriter, Subscribe, SupervisorBuilder, SyntheticWorkload};
//!
//! # async fn demo() {
//! let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//! let sup = SupervisorBuilder::new(Config::default(), Arc::new(SyntheticWorkload::new()))
//!     .with_subscribers(subs)
//!     .build();
//! # let _ = sup;
//! # }
//! ```

use std::sync::Arc;

use crate::config::Config;
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::workload::Workload;

use super::supervisor::Supervisor;

/// Builder for a [`Supervisor`] with optional subscribers.
pub struct SupervisorBuilder<W: Workload> {
    cfg: Config,
    workload: Arc<W>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<W: Workload> SupervisorBuilder<W> {
    pub fn new(cfg: Config, workload: Arc<W>) -> Self {
        Self {
            cfg,
            workload,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers; each gets its own bounded queue and task.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the supervisor. Must be called inside a tokio runtime.
    pub fn build(self) -> Supervisor<W> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        Supervisor::new_internal(self.cfg, self.workload, bus, subs)
    }
}
