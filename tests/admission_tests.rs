use std::sync::Arc;
use std::thread;
use std::time::Duration;

use catalog::admission::{AdmissionController, AdmissionSettings, ManualClock, ReclaimTask};
use tokio_util::sync::CancellationToken;

fn settings(rate_per_second: f64, burst: u32) -> AdmissionSettings {
    AdmissionSettings {
        rate_per_second,
        burst,
        ttl: Duration::from_secs(600),
        reclaim_interval: Duration::from_secs(60),
    }
}

fn drain<C: catalog::admission::Clock>(controller: &AdmissionController<C>, key: &str) -> usize {
    let mut admitted = 0;
    while controller.allow(key) {
        admitted += 1;
    }
    admitted
}

#[test]
fn test_refill_after_half_second() {
    let clock = ManualClock::new();
    let controller = AdmissionController::with_clock(settings(10.0, 10), clock.clone());

    assert_eq!(drain(&controller, "client"), 10);
    assert!(controller.tokens("client").unwrap() < 1.0);

    clock.advance(Duration::from_millis(500));
    assert!(controller.allow("client"));

    let tokens = controller.tokens("client").unwrap();
    assert!((tokens - 4.0).abs() < 1e-9, "tokens = {tokens}");
}

#[test]
fn test_burst_ceiling_after_long_idle() {
    let clock = ManualClock::new();
    let controller = AdmissionController::with_clock(settings(10.0, 20), clock.clone());

    drain(&controller, "client");
    clock.advance(Duration::from_secs(100));

    let admitted = (0..25).filter(|_| controller.allow("client")).count();
    assert_eq!(admitted, 20);
}

#[test]
fn test_tokens_stay_within_bounds() {
    let clock = ManualClock::new();
    let controller = AdmissionController::with_clock(settings(3.0, 4), clock.clone());
    let mut advanced = false;

    for step in 0..200u64 {
        let before = controller.tokens("client");
        let admitted = controller.allow("client");
        let after = controller.tokens("client").unwrap();

        assert!((0.0..=4.0).contains(&after), "step {step}: tokens = {after}");
        if let (true, false, Some(before)) = (admitted, advanced, before) {
            assert!(before >= 1.0, "step {step}: admitted with {before}");
        }

        advanced = step % 7 == 0;
        if advanced {
            clock.advance(Duration::from_millis(step * 13 % 900));
        }
    }
}

#[test]
fn test_reclaim_removes_only_idle_buckets() {
    let clock = ManualClock::new();
    let mut config = settings(10.0, 5);
    config.ttl = Duration::from_secs(60);
    let controller = AdmissionController::with_clock(config, clock.clone());

    controller.allow("stale");
    clock.advance(Duration::from_secs(45));
    controller.allow("fresh");
    clock.advance(Duration::from_secs(30));

    assert_eq!(controller.reclaim(), 1);
    assert!(controller.tokens("stale").is_none());
    assert!(controller.tokens("fresh").is_some());
    assert_eq!(controller.tracked_clients(), 1);
}

#[test]
fn test_reclaimed_client_starts_full() {
    let clock = ManualClock::new();
    let mut config = settings(1.0, 3);
    config.ttl = Duration::from_secs(10);
    let controller = AdmissionController::with_clock(config, clock.clone());

    assert_eq!(drain(&controller, "client"), 3);
    clock.advance(Duration::from_secs(11));
    controller.reclaim();

    assert_eq!(drain(&controller, "client"), 3);
}

#[test]
fn test_disabled_reclamation_keeps_buckets() {
    let clock = ManualClock::new();
    let mut config = settings(10.0, 5);
    config.ttl = Duration::ZERO;
    let controller = AdmissionController::with_clock(config, clock.clone());

    controller.allow("client");
    clock.advance(Duration::from_secs(86_400));

    assert_eq!(controller.reclaim(), 0);
    assert_eq!(controller.tracked_clients(), 1);
}

#[test]
fn test_concurrent_checks_never_overspend() {
    let clock = ManualClock::new();
    let controller = Arc::new(AdmissionController::with_clock(settings(1.0, 50), clock));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = Arc::clone(&controller);
            thread::spawn(move || (0..20).filter(|_| controller.allow("shared")).count())
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(admitted, 50);
}

#[test]
fn test_keys_are_independent() {
    let clock = ManualClock::new();
    let controller = AdmissionController::with_clock(settings(1.0, 2), clock);

    assert_eq!(drain(&controller, "a"), 2);
    assert!(controller.allow("b"));
    assert!(controller.retry_after("a") >= 1);
}

#[tokio::test]
async fn test_reclaim_task_runs_and_stops() {
    let mut config = settings(10.0, 5);
    config.ttl = Duration::from_millis(20);
    config.reclaim_interval = Duration::from_millis(25);
    let controller = Arc::new(AdmissionController::new(config));

    controller.allow("client");
    assert_eq!(controller.tracked_clients(), 1);

    let token = CancellationToken::new();
    let handle = ReclaimTask::spawn(Arc::clone(&controller), token.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(controller.tracked_clients(), 0);

    handle.shutdown().await;
    assert!(token.is_cancelled());
}

#[tokio::test]
async fn test_reclaim_task_not_spawned_when_disabled() {
    let mut config = settings(10.0, 5);
    config.reclaim_interval = Duration::ZERO;
    let controller = Arc::new(AdmissionController::new(config));

    assert!(ReclaimTask::spawn(controller, CancellationToken::new()).is_none());
}
