//! End-to-end replay integration tests.
//!
//! Tests that verify delivery, stale-action cleanup, and cache invalidation
//! against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use outbox::testing::{MockInvoker, RecordingCache};
use outbox::{
    ActionScheduler, ActionStore, MemoryStore, NetworkMonitor, PendingAction, SchedulerConfig,
    TargetParams, action_key, instance_key,
};

use crate::common::wait_until;

fn config() -> SchedulerConfig {
    SchedulerConfig::new("notes").with_reattempt_interval(Duration::from_secs(60))
}

fn target(id: i64) -> TargetParams {
    TargetParams::new().with("id", id)
}

fn sync_action(id: i64) -> PendingAction {
    PendingAction::new("sync", json!({"body": {"id": id}}), target(id))
}

struct Fixture {
    scheduler: ActionScheduler<MemoryStore, MockInvoker, RecordingCache>,
    store: Arc<MemoryStore>,
    invoker: Arc<MockInvoker>,
    cache: Arc<RecordingCache>,
    network: NetworkMonitor,
}

fn fixture(online: bool) -> Fixture {
    let network = NetworkMonitor::new(online);
    let store = Arc::new(MemoryStore::new());
    let invoker = Arc::new(MockInvoker::new());
    let cache = Arc::new(RecordingCache::new());
    let scheduler = ActionScheduler::with_shared(
        config(),
        Arc::clone(&store),
        Arc::clone(&invoker),
        Arc::clone(&cache),
        network.clone(),
    );
    Fixture {
        scheduler,
        store,
        invoker,
        cache,
        network,
    }
}

async fn seed(store: &MemoryStore, id: i64) {
    let key = instance_key(&config(), &target(id));
    store
        .set_item(key.as_str(), json!({"id": id, "title": "cached"}))
        .await
        .unwrap();
}

/// Test: delivery removes the action record and the instance snapshot, and
/// invalidates the cache for the completed target.
#[tokio::test]
async fn test_delivery_cleans_state_and_invalidates_cache() {
    let f = fixture(true);

    f.scheduler
        .add_action(&target(1), sync_action(1))
        .await
        .unwrap();
    seed(&f.store, 1).await;

    f.scheduler.reconcile().await;

    assert!(f.store.keys().await.unwrap().is_empty());
    assert!(f.cache.invalidated().await.contains(&target(1)));

    let recorded = f.invoker.invocations().await;
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].options.http_only);
    assert_eq!(recorded[0].instance, json!({"id": 1, "title": "cached"}));
}

/// Test: an action whose instance snapshot is gone is discarded without ever
/// reaching the invoker, while healthy actions in the same pass proceed.
#[tokio::test]
async fn test_stale_action_discarded_while_others_deliver() {
    let f = fixture(true);

    f.scheduler
        .add_action(&target(1), sync_action(1))
        .await
        .unwrap();
    f.scheduler
        .add_action(&target(2), sync_action(2))
        .await
        .unwrap();
    // Only target 1 has a snapshot; target 2 is stale.
    seed(&f.store, 1).await;

    f.scheduler.reconcile().await;

    let recorded = f.invoker.invocations().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].http_params, json!({"body": {"id": 1}}));

    assert!(f.store.keys().await.unwrap().is_empty());
    assert_eq!(f.cache.invalidated().await, vec![target(1)]);
}

/// Test: removing a queued action before reconnection supersedes it.
#[tokio::test]
async fn test_superseded_action_never_delivered() {
    let f = fixture(false);
    f.scheduler.start().await;

    f.scheduler
        .add_action(&target(1), sync_action(1))
        .await
        .unwrap();
    seed(&f.store, 1).await;

    // An online write won the race; the queued copy is no longer needed.
    f.scheduler.remove_action(&target(1)).await.unwrap();

    f.network.set_online();
    wait_until("the transition pass to finish", Duration::from_secs(2), || {
        let cache = Arc::clone(&f.cache);
        async move { !cache.batches().await.is_empty() }
    })
    .await;

    assert_eq!(f.invoker.invocation_count().await, 0);
    assert!(
        f.store
            .get_item(action_key(&target(1)).as_str())
            .await
            .unwrap()
            .is_none()
    );

    f.scheduler.stop().await;
}

/// Test: all pending actions in a pass are attempted and invalidated in one
/// bulk cache call.
#[tokio::test]
async fn test_all_pending_targets_attempted_concurrently() {
    let f = fixture(true);

    for id in 1..=3 {
        f.scheduler
            .add_action(&target(id), sync_action(id))
            .await
            .unwrap();
        seed(&f.store, id).await;
    }

    f.scheduler.reconcile().await;

    assert_eq!(f.invoker.invocation_count().await, 3);
    assert!(f.store.keys().await.unwrap().is_empty());

    let batches = f.cache.batches().await;
    assert_eq!(batches.len(), 1, "one bulk invalidation per pass");
    for id in 1..=3 {
        assert!(batches[0].contains(&target(id)));
    }
}

/// Test: a failed delivery leaves everything queued; the next reconnect
/// replays and completes it.
#[tokio::test]
async fn test_failed_delivery_replayed_on_next_reconnect() {
    let network = NetworkMonitor::offline();
    let store = Arc::new(MemoryStore::new());
    let invoker = Arc::new(MockInvoker::failing(1));
    let cache = Arc::new(RecordingCache::new());
    let scheduler = ActionScheduler::with_shared(
        config(),
        Arc::clone(&store),
        Arc::clone(&invoker),
        Arc::clone(&cache),
        network.clone(),
    );
    scheduler.start().await;

    scheduler
        .add_action(&target(1), sync_action(1))
        .await
        .unwrap();
    seed(&store, 1).await;

    // First reconnect: the attempt fails and the record must survive.
    network.set_online();
    wait_until("the first attempt to fail", Duration::from_secs(2), || {
        let invoker = Arc::clone(&invoker);
        async move { invoker.invocation_count().await == 1 }
    })
    .await;
    wait_until("the first pass to finish", Duration::from_secs(2), || {
        let cache = Arc::clone(&cache);
        async move { !cache.batches().await.is_empty() }
    })
    .await;
    assert!(
        store
            .get_item(action_key(&target(1)).as_str())
            .await
            .unwrap()
            .is_some()
    );

    // Second reconnect: the replay succeeds and cleans up.
    network.set_offline();
    network.set_online();

    wait_until("the replayed action to deliver", Duration::from_secs(2), || {
        let store = Arc::clone(&store);
        async move { store.keys().await.unwrap().is_empty() }
    })
    .await;

    assert_eq!(invoker.invocation_count().await, 2);
    assert!(cache.invalidated().await.contains(&target(1)));

    scheduler.stop().await;
}
