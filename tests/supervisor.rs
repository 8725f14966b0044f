mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{ChipWorkload, Hanging, quick_config};
use stressvisor::{
    ConfigError, Event, EventKind, RuntimeError, StopReason, Subscribe, Supervisor,
    SupervisorBuilder, WorkerState,
};

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Event>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.seen.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    fn first(&self, kind: EventKind) -> Option<Event> {
        self.seen.lock().unwrap().iter().find(|e| e.kind == kind).cloned()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.seen.lock().unwrap().push(ev.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hung_worker_is_the_only_one_aborted() {
    let workload = Arc::new(Hanging::new("worker-1"));
    let recorder = Arc::new(Recorder::default());
    let sup = SupervisorBuilder::new(quick_config(3), Arc::clone(&workload))
        .subscriber(recorder.clone())
        .build();

    let report = tokio::time::timeout(Duration::from_secs(10), sup.run())
        .await
        .expect("polling loop must end after a hang")
        .unwrap();
    sup.close().await;
    workload.release();

    assert_eq!(report.reason, StopReason::Hang);
    assert_eq!(report.hung, vec![1]);

    let stuck = report.exit(1).unwrap();
    assert_eq!(stuck.state, WorkerState::Aborted);
    assert!(stuck.detached);
    assert!(
        stuck.trace.starts_with("worker-1 aborted at iteration 0 during apply("),
        "trace: {}",
        stuck.trace
    );

    for i in [0, 2] {
        let exit = report.exit(i).unwrap();
        assert_eq!(exit.state, WorkerState::Stopped);
        assert!(exit.trace.is_empty());
        assert!(!exit.detached);
        assert!(exit.iterations > 0);
    }

    let kinds = recorder.kinds();
    assert!(kinds.contains(&EventKind::StatusReport));
    assert!(kinds.contains(&EventKind::GraceExceeded));
    assert_eq!(kinds.last(), Some(&EventKind::PoolDrained));
    let hang = recorder.first(EventKind::HangDetected).unwrap();
    assert_eq!(hang.worker.as_deref(), Some("worker-1"));
    assert_eq!(hang.limit_ms, Some(300));
    assert!(hang.age_ms.unwrap() >= 300);
    let aborted: Vec<_> = recorder
        .seen
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.kind == EventKind::WorkerAborted)
        .filter_map(|e| e.worker.clone())
        .collect();
    assert_eq!(aborted, vec![Arc::<str>::from("worker-1")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn external_stop_is_clean() {
    let mut cfg = quick_config(2);
    cfg.hang_limit = Duration::from_secs(200);
    let sup = Supervisor::new(cfg, Arc::new(ChipWorkload::default()));

    let stop = sup.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        stop.cancel();
    });

    let report = sup.run().await.unwrap();
    assert_eq!(report.reason, StopReason::Requested);
    assert!(report.hung.is_empty());
    assert_eq!(report.exits.len(), 2);
    assert_eq!(report.detached().count(), 0);
    for exit in &report.exits {
        assert_eq!(exit.state, WorkerState::Stopped);
        assert!(exit.trace.is_empty());
    }
    assert!(report.total_iterations() > 0);
    assert!(report.pool_drained <= 4);
}

#[tokio::test]
async fn invalid_config_is_rejected_before_spawning() {
    let mut cfg = quick_config(2);
    cfg.worker.probability_of_return = 2.0;
    let sup = Supervisor::new(cfg, Arc::new(ChipWorkload::default()));

    let err = sup.run().await.unwrap_err();
    assert_eq!(err.as_label(), "runtime_invalid_config");
    assert!(matches!(
        err,
        RuntimeError::InvalidConfig(ConfigError::Probability { name: "probability_of_return", .. })
    ));
}
