use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use packsight_realtime::{Poller, PollingState};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    total_detections: u32,
}

fn snapshot_poller(period: Duration, fail_from: u32) -> (Poller<Snapshot>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let poller = Poller::new(period, move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n >= fail_from {
                Err(format!("Telemetry store returned status 503 on fetch {}", n))
            } else {
                Ok(Snapshot {
                    total_detections: n * 100,
                })
            }
        }
    });
    (poller, calls)
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_loading_then_data() {
    let (poller, _) = snapshot_poller(Duration::from_secs(30), u32::MAX);
    let mut changes = poller.subscribe();
    assert_eq!(*changes.borrow_and_update(), PollingState::default());

    poller.activate();
    assert!(changes.borrow_and_update().is_loading);

    changes.changed().await.unwrap();
    let state = changes.borrow_and_update().clone();
    assert!(!state.is_loading);
    assert_eq!(state.data, Some(Snapshot { total_detections: 100 }));
    assert!(state.last_fetched_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_outage_keeps_last_snapshot() {
    let (poller, calls) = snapshot_poller(Duration::from_secs(30), 2);
    poller.activate();
    tokio::time::sleep(Duration::from_secs(31)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let state = poller.state();
    assert_eq!(state.data, Some(Snapshot { total_detections: 100 }));
    assert!(state.error.unwrap().contains("503"));

    // polling continues through the outage
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_follow_restarts_on_every_change() {
    let (poller, calls) = snapshot_poller(Duration::from_secs(60), u32::MAX);
    let (identity, rx) = watch::channel(Some("owner@pepsi.example".to_string()));

    poller.follow(rx, Option::is_some);
    assert!(poller.is_active());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    identity
        .send(Some("owner@coca-cola.example".to_string()))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(poller.state().data, Some(Snapshot { total_detections: 200 }));

    drop(identity);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(!poller.is_active());
}

#[test]
fn test_inactive_refetch_outside_runtime_context() {
    let (poller, calls) = snapshot_poller(Duration::from_secs(5), u32::MAX);
    tokio_test::block_on(poller.refetch());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(poller.period(), Duration::from_secs(5));
}
