//! Connectivity and retry-timer lifecycle integration tests.
//!
//! Tests that verify the scheduler reacts to network transitions: replay on
//! reconnection, timer enablement while online, and suspension while offline.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use outbox::testing::{MockInvoker, RecordingCache};
use outbox::{
    ActionScheduler, ActionStore, MemoryStore, NetworkMonitor, PendingAction, SchedulerConfig,
    TargetParams, action_key, instance_key,
};

use crate::common::wait_until;

fn config(interval: Duration) -> SchedulerConfig {
    SchedulerConfig::new("notes").with_reattempt_interval(interval)
}

fn target(id: i64) -> TargetParams {
    TargetParams::new().with("id", id)
}

async fn seed(store: &MemoryStore, cfg: &SchedulerConfig, id: i64) {
    let key = instance_key(cfg, &target(id));
    store
        .set_item(key.as_str(), json!({"id": id}))
        .await
        .unwrap();
}

/// Test: an action queued while offline is delivered immediately on the
/// transition to online, without waiting for the retry timer.
#[tokio::test]
async fn test_offline_queue_replayed_on_reconnect() {
    let cfg = config(Duration::from_millis(1000));
    let network = NetworkMonitor::offline();
    let store = Arc::new(MemoryStore::new());
    let invoker = Arc::new(MockInvoker::new());
    let cache = Arc::new(RecordingCache::new());

    let scheduler = ActionScheduler::with_shared(
        cfg.clone(),
        Arc::clone(&store),
        Arc::clone(&invoker),
        Arc::clone(&cache),
        network.clone(),
    );
    scheduler.start().await;

    scheduler
        .add_action(
            &target(1),
            PendingAction::new("sync", json!({}), target(1)),
        )
        .await
        .unwrap();
    seed(&store, &cfg, 1).await;

    // Still offline: one stored action record, no invocations, no timer.
    assert!(
        store
            .get_item(action_key(&target(1)).as_str())
            .await
            .unwrap()
            .is_some()
    );
    assert_eq!(invoker.invocation_count().await, 0);
    assert!(!scheduler.is_retrying().await);

    network.set_online();

    // Delivered well before the 1s timer could fire.
    wait_until("the queued action to be delivered", Duration::from_millis(500), || {
        let invoker = Arc::clone(&invoker);
        async move { invoker.invocation_count().await == 1 }
    })
    .await;
    assert!(scheduler.is_retrying().await);

    scheduler.stop().await;
}

/// Test: while online, the retry timer keeps re-attempting a failing action
/// until it succeeds.
#[tokio::test]
async fn test_timer_retries_until_delivery_succeeds() {
    let cfg = config(Duration::from_millis(50));
    let network = NetworkMonitor::online();
    let store = Arc::new(MemoryStore::new());
    // Fails twice: delivered on the third attempt.
    let invoker = Arc::new(MockInvoker::failing(2));
    let cache = Arc::new(RecordingCache::new());

    let scheduler = ActionScheduler::with_shared(
        cfg.clone(),
        Arc::clone(&store),
        Arc::clone(&invoker),
        Arc::clone(&cache),
        network,
    );

    scheduler
        .add_action(
            &target(1),
            PendingAction::new("sync", json!({}), target(1)),
        )
        .await
        .unwrap();
    seed(&store, &cfg, 1).await;

    scheduler.start().await;

    wait_until("the action to survive retries and deliver", Duration::from_secs(2), || {
        let store = Arc::clone(&store);
        async move { store.keys().await.unwrap().is_empty() }
    })
    .await;

    assert!(invoker.invocation_count().await >= 3);

    scheduler.stop().await;
}

/// Test: going offline suspends delivery attempts entirely.
#[tokio::test]
async fn test_offline_suspends_attempts() {
    let cfg = config(Duration::from_millis(50));
    let network = NetworkMonitor::online();
    let store = Arc::new(MemoryStore::new());
    // Never succeeds, so attempts continue for as long as the timer runs.
    let invoker = Arc::new(MockInvoker::failing(u32::MAX));
    let cache = Arc::new(RecordingCache::new());

    let scheduler = ActionScheduler::with_shared(
        cfg.clone(),
        Arc::clone(&store),
        Arc::clone(&invoker),
        Arc::clone(&cache),
        network.clone(),
    );

    scheduler
        .add_action(
            &target(1),
            PendingAction::new("sync", json!({}), target(1)),
        )
        .await
        .unwrap();
    seed(&store, &cfg, 1).await;

    scheduler.start().await;

    wait_until("at least one delivery attempt", Duration::from_secs(2), || {
        let invoker = Arc::clone(&invoker);
        async move { invoker.invocation_count().await >= 1 }
    })
    .await;

    network.set_offline();
    wait_until("the retry timer to stop", Duration::from_secs(2), || {
        let scheduler = scheduler.clone();
        async move { !scheduler.is_retrying().await }
    })
    .await;

    // Give any in-flight pass time to finish, then verify attempts stopped.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let settled = invoker.invocation_count().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(invoker.invocation_count().await, settled);

    // The action is still queued for the next reconnect.
    assert!(
        store
            .get_item(action_key(&target(1)).as_str())
            .await
            .unwrap()
            .is_some()
    );

    scheduler.stop().await;
}
