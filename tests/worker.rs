mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Chip, ChipWorkload, FuseWorkload, Hanging, quick_config, wait_until};
use stressvisor::{
    ArtifactPool, ConfigError, OperationKind, RuntimeError, SyntheticWorkload, Worker,
    WorkerState,
};
use tokio::time::Instant;

fn pool() -> Arc<ArtifactPool<Chip>> {
    Arc::new(ArtifactPool::new(4))
}

#[tokio::test]
async fn cooperative_stop_leaves_empty_trace() {
    let cfg = Arc::new(quick_config(1).worker);
    let w = Worker::spawn(0, Arc::new(ChipWorkload::default()), pool(), cfg, 1).unwrap();
    assert_eq!(w.name(), "worker-0");
    assert!(wait_until(|| w.counter() > 10).await);

    w.request_stop();
    let before = w.counter();
    let exit = w.join().await;

    assert_eq!(exit.state, WorkerState::Stopped);
    assert!(exit.trace.is_empty());
    assert!(!exit.detached);
    assert!(exit.iterations >= before);
}

#[tokio::test]
async fn abort_captures_stage_and_keeps_counter() {
    let mut cfg = quick_config(1).worker;
    cfg.probability_of_return = 1.0;
    let workload = Arc::new(Hanging::wrap("worker-0", SyntheticWorkload::new()));
    let pool = Arc::new(ArtifactPool::new(4));
    let w = Worker::spawn(
        0,
        Arc::clone(&workload),
        Arc::clone(&pool),
        Arc::new(cfg),
        7,
    )
    .unwrap();
    assert!(wait_until(|| workload.entered()).await);

    let at = w.counter();
    assert!(w.abort());
    assert!(!w.abort());
    assert_eq!(w.state(), WorkerState::Aborted);

    workload.release();
    let exit = w.join().await;

    assert_eq!(exit.state, WorkerState::Aborted);
    assert_eq!(exit.iterations, at);
    assert!(!exit.detached);
    let prefix = format!("worker-0 aborted at iteration {at} during apply(");
    assert!(exit.trace.starts_with(&prefix), "trace: {}", exit.trace);

    // Whatever the worker held was dropped, never pushed nor disposed.
    assert!(pool.is_empty());
    let stats = workload.inner().stats().snapshot();
    assert!(stats.reclaimed >= 1, "{stats}");
    assert_eq!(stats.live(), 0, "{stats}");
}

#[tokio::test]
async fn invalid_config_is_rejected_at_spawn() {
    let mut cfg = quick_config(1).worker;
    cfg.weights = vec![(OperationKind::Blur, 0.0)];
    let err = Worker::spawn(0, Arc::new(ChipWorkload::default()), pool(), Arc::new(cfg), 1)
        .unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidConfig(ConfigError::ZeroTotalWeight)));

    let mut cfg = quick_config(1).worker;
    cfg.probability_of_return = 7.0;
    let err = Worker::spawn(0, Arc::new(ChipWorkload::default()), pool(), Arc::new(cfg), 1)
        .unwrap_err();
    assert_eq!(err.as_label(), "runtime_invalid_config");
}

#[tokio::test]
async fn escaped_panic_ends_worker_as_aborted() {
    let mut cfg = quick_config(1).worker;
    cfg.probability_of_duplicate = 1.0;
    let w = Worker::spawn(
        0,
        Arc::new(FuseWorkload),
        Arc::new(ArtifactPool::new(4)),
        Arc::new(cfg),
        1,
    )
    .unwrap();

    let exit = w.join().await;
    assert_eq!(exit.state, WorkerState::Aborted);
    assert_eq!(exit.iterations, 0);
    assert_eq!(
        exit.trace,
        "worker-0 panicked at iteration 0 during household: fuse blew"
    );
}

#[tokio::test]
async fn stuck_worker_is_detached_at_deadline() {
    let cfg = Arc::new(quick_config(1).worker);
    let workload = Arc::new(Hanging::new("worker-3"));
    let w = Worker::spawn(3, Arc::clone(&workload), pool(), cfg, 3).unwrap();
    assert!(wait_until(|| workload.entered()).await);

    w.request_stop();
    assert_eq!(w.state(), WorkerState::StopRequested);
    assert!(w.abort());

    let exit = w
        .join_until(Instant::now() + Duration::from_millis(50))
        .await;
    assert!(exit.detached);
    assert_eq!(exit.state, WorkerState::Aborted);
    assert!(!exit.trace.is_empty());

    workload.release();
}

#[tokio::test]
async fn abort_after_exit_is_refused() {
    let cfg = Arc::new(quick_config(1).worker);
    let w = Worker::spawn(0, Arc::new(ChipWorkload::default()), pool(), cfg, 1).unwrap();
    w.request_stop();
    assert!(wait_until(|| w.state() == WorkerState::Stopped).await);
    assert!(!w.abort());
    let exit = w.join().await;
    assert_eq!(exit.state, WorkerState::Stopped);
    assert!(exit.trace.is_empty());
}
