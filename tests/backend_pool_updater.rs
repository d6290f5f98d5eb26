//! End-to-end tests of the batched updater running on its own timer.

use std::sync::Arc;
use std::time::Duration;

use backend_pool_sync::cloud::{ApiError, PoolDefinition};
use backend_pool_sync::lifecycle::Shutdown;
use backend_pool_sync::reconciler::{BackendPoolUpdater, Operation, Outcome, ReconcileError};

mod common;

use common::{api_with_empty_pools, ip, ips, pool, svc1, GatedApi};

const INTERVAL: Duration = Duration::from_secs(1);

#[tokio::test(start_paused = true)]
async fn test_add_ips_to_empty_pool() {
    let api = api_with_empty_pools(&["pool1"]);
    let updater = BackendPoolUpdater::new(api.clone(), INTERVAL);
    let shutdown = Shutdown::new();
    let task = tokio::spawn(updater.clone().run(shutdown.subscribe()));

    let (op, handle) = Operation::add_ips(svc1(), pool("lb1", "pool1"), ips(&["10.0.0.1", "10.0.0.2"]));
    updater.enqueue(op);

    assert_eq!(handle.wait().await, Ok(Outcome::Applied));
    assert_eq!(
        api.pool("lb1", "pool1"),
        Some(PoolDefinition::with_ips("pool1", ips(&["10.0.0.1", "10.0.0.2"])))
    );
    assert_eq!(api.get_count("lb1", "pool1"), 1);
    assert_eq!(api.update_count("lb1", "pool1"), 1);

    shutdown.trigger();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_add_then_remove_in_one_interval_leaves_pool_unchanged() {
    let api = api_with_empty_pools(&["pool1"]);
    let updater = BackendPoolUpdater::new(api.clone(), INTERVAL);
    let shutdown = Shutdown::new();
    let task = tokio::spawn(updater.clone().run(shutdown.subscribe()));

    let addrs = ips(&["10.0.0.1", "10.0.0.2"]);
    let (add, add_handle) = Operation::add_ips(svc1(), pool("lb1", "pool1"), addrs.clone());
    let (remove, remove_handle) = Operation::remove_ips(svc1(), pool("lb1", "pool1"), addrs);
    updater.enqueue(add);
    updater.enqueue(remove);

    assert_eq!(add_handle.wait().await, Ok(Outcome::Unchanged));
    assert_eq!(remove_handle.wait().await, Ok(Outcome::Unchanged));
    assert!(api.pool("lb1", "pool1").unwrap().addresses.is_empty());
    assert_eq!(api.get_count("lb1", "pool1"), 1);
    assert_eq!(api.update_count("lb1", "pool1"), 0);

    shutdown.trigger();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_operations_in_two_batches() {
    let api = api_with_empty_pools(&["pool1"]);
    let updater = BackendPoolUpdater::new(api.clone(), INTERVAL);
    let shutdown = Shutdown::new();
    let task = tokio::spawn(updater.clone().run(shutdown.subscribe()));

    let addrs = ips(&["10.0.0.1", "10.0.0.2"]);
    let (add, add_handle) = Operation::add_ips(svc1(), pool("lb1", "pool1"), addrs.clone());
    updater.enqueue(add);
    assert_eq!(add_handle.wait().await, Ok(Outcome::Applied));
    assert_eq!(api.pool("lb1", "pool1").unwrap().ips(), addrs);

    let (remove, remove_handle) = Operation::remove_ips(svc1(), pool("lb1", "pool1"), addrs);
    updater.enqueue(remove);
    assert_eq!(remove_handle.wait().await, Ok(Outcome::Applied));
    assert!(api.pool("lb1", "pool1").unwrap().addresses.is_empty());

    assert_eq!(api.get_count("lb1", "pool1"), 2);
    assert_eq!(api.update_count("lb1", "pool1"), 2);

    shutdown.trigger();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failure_on_one_pool_does_not_block_another() {
    let api = api_with_empty_pools(&["pool1", "pool2"]);
    api.fail_next_update("lb1", "pool1", ApiError::terminal("error"));
    let updater = BackendPoolUpdater::new(api.clone(), INTERVAL);
    let shutdown = Shutdown::new();
    let task = tokio::spawn(updater.clone().run(shutdown.subscribe()));

    let addrs = ips(&["10.0.0.1", "10.0.0.2"]);
    let (op1, h1) = Operation::add_ips(svc1(), pool("lb1", "pool1"), addrs.clone());
    let (op2, h2) = Operation::add_ips(svc1(), pool("lb1", "pool2"), addrs.clone());
    updater.enqueue(op1);
    updater.enqueue(op2);

    assert!(matches!(h1.wait().await, Err(ReconcileError::Update { .. })));
    assert_eq!(h2.wait().await, Ok(Outcome::Applied));
    assert!(api.pool("lb1", "pool1").unwrap().addresses.is_empty());
    assert_eq!(api.pool("lb1", "pool2").unwrap().ips(), addrs);
    assert_eq!(api.get_count("lb1", "pool2"), 1);
    assert_eq!(api.update_count("lb1", "pool2"), 1);

    // The loop keeps ticking after a failed group.
    let (retry, retry_handle) = Operation::add_ips(svc1(), pool("lb1", "pool1"), addrs);
    updater.enqueue(retry);
    assert_eq!(retry_handle.wait().await, Ok(Outcome::Applied));

    shutdown.trigger();
    task.await.unwrap();
}

#[tokio::test]
async fn test_withdraw_before_drain() {
    let api = api_with_empty_pools(&["pool1"]);
    let updater = BackendPoolUpdater::new(api.clone(), INTERVAL);

    let (op, handle) = Operation::add_ips(svc1(), pool("lb1", "pool1"), [ip("10.0.0.1")]);
    updater.enqueue(op);
    assert_eq!(updater.withdraw(&svc1()), 1);

    updater.drain_once().await;
    assert_eq!(handle.wait().await, Err(ReconcileError::Withdrawn));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_withdraw_after_drain_started_does_not_cancel() {
    let api = Arc::new(GatedApi::new(Default::default()));
    api.inner.insert_pool("lb1", PoolDefinition::new("pool1"));
    let updater = BackendPoolUpdater::new(api.clone(), INTERVAL);

    let (op, handle) = Operation::add_ips(svc1(), pool("lb1", "pool1"), [ip("10.0.0.1")]);
    updater.enqueue(op);

    let drain = tokio::spawn({
        let updater = updater.clone();
        async move { updater.drain_once().await }
    });
    api.fetch_started().await;

    // Already applying: nothing left to withdraw.
    assert_eq!(updater.withdraw(&svc1()), 0);
    api.release(1);

    let report = drain.await.unwrap();
    assert_eq!(report.groups, 1);
    assert_eq!(handle.wait().await, Ok(Outcome::Applied));
    assert_eq!(api.inner.pool("lb1", "pool1").unwrap().ips(), vec![ip("10.0.0.1")]);
}

#[tokio::test]
async fn test_operations_enqueued_during_drain_wait_for_next_cycle() {
    let api = Arc::new(GatedApi::new(Default::default()));
    api.inner.insert_pool("lb1", PoolDefinition::new("pool1"));
    let updater = BackendPoolUpdater::new(api.clone(), INTERVAL);

    let (first, first_handle) = Operation::add_ips(svc1(), pool("lb1", "pool1"), [ip("10.0.0.1")]);
    updater.enqueue(first);

    let drain = tokio::spawn({
        let updater = updater.clone();
        async move { updater.drain_once().await }
    });
    api.fetch_started().await;

    let (second, second_handle) = Operation::add_ips(svc1(), pool("lb1", "pool1"), [ip("10.0.0.2")]);
    updater.enqueue(second);
    api.release(1);

    assert_eq!(drain.await.unwrap().drained, 1);
    assert_eq!(first_handle.wait().await, Ok(Outcome::Applied));
    assert_eq!(api.inner.pool("lb1", "pool1").unwrap().ips(), vec![ip("10.0.0.1")]);
    assert_eq!(updater.pending(), 1);

    api.release(1);
    assert_eq!(updater.drain_once().await.drained, 1);
    assert_eq!(second_handle.wait().await, Ok(Outcome::Applied));
    assert_eq!(
        api.inner.pool("lb1", "pool1").unwrap().ips(),
        vec![ip("10.0.0.1"), ip("10.0.0.2")]
    );
}

#[tokio::test]
async fn test_reapplying_reflected_operation_makes_no_update() {
    let api = api_with_empty_pools(&[]);
    api.insert_pool("lb1", PoolDefinition::with_ips("pool1", [ip("10.0.0.1")]));
    let updater = BackendPoolUpdater::new(api.clone(), INTERVAL);

    let (add, add_handle) = Operation::add_ips(svc1(), pool("lb1", "pool1"), [ip("10.0.0.1")]);
    let (remove, remove_handle) = Operation::remove_ips(svc1(), pool("lb1", "pool1"), [ip("10.0.0.9")]);
    updater.enqueue(add);
    updater.enqueue(remove);
    updater.drain_once().await;

    assert_eq!(add_handle.wait().await, Ok(Outcome::Unchanged));
    assert_eq!(remove_handle.wait().await, Ok(Outcome::Unchanged));
    assert_eq!(api.update_count("lb1", "pool1"), 0);
}

#[tokio::test]
async fn test_concurrent_producers_land_in_one_batch() {
    let api = api_with_empty_pools(&["pool1"]);
    let updater = BackendPoolUpdater::new(api.clone(), INTERVAL);

    let mut producers = Vec::new();
    for i in 1..=50u8 {
        let updater = updater.clone();
        producers.push(tokio::spawn(async move {
            let (op, handle) = Operation::add_ips(svc1(), pool("lb1", "pool1"), [ip(&format!("10.0.1.{i}"))]);
            updater.enqueue(op);
            handle
        }));
    }
    let mut handles = Vec::new();
    for producer in producers {
        handles.push(producer.await.unwrap());
    }
    assert_eq!(updater.pending(), 50);

    let report = updater.drain_once().await;
    assert_eq!(report.drained, 50);
    assert_eq!(report.groups, 1);
    for handle in handles {
        assert_eq!(handle.wait().await, Ok(Outcome::Applied));
    }
    assert_eq!(api.pool("lb1", "pool1").unwrap().addresses.len(), 50);
    assert_eq!(api.get_count("lb1", "pool1"), 1);
    assert_eq!(api.update_count("lb1", "pool1"), 1);
}
