//! Batched backend pool updater.
//!
//! # Responsibilities
//! - Accept operations from producers (`enqueue`) and withdraw them by service
//! - Drain the whole queue on a fixed interval
//! - Group drained operations by load balancer, then pool
//! - Dispatch one task per group and wait for the cycle to finish
//! - Keep ticking whatever the groups' outcomes

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::cloud::NetworkApi;
use crate::lifecycle::shutdown;
use crate::membership::{ServiceName, ServiceRoutingTable};
use crate::observability::metrics;
use crate::reconciler::apply::process_group;
use crate::reconciler::operation::Operation;
use crate::reconciler::queue::PendingQueue;
use crate::reconciler::types::{DrainReport, Outcome, PoolKey};

/// Shortest drain interval; `tokio::time::interval` rejects a zero period.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Drained operations grouped by load balancer, then pool, in insertion order.
type Groups = BTreeMap<String, BTreeMap<String, Vec<Operation>>>;

/// Batches backend pool operations and applies them once per interval.
///
/// Clones share the same queue, so producers can hold their own handle.
#[derive(Clone)]
pub struct BackendPoolUpdater {
    queue: Arc<PendingQueue>,
    api: Arc<dyn NetworkApi>,
    routes: Option<ServiceRoutingTable>,
    interval: Duration,
}

impl BackendPoolUpdater {
    /// Create an updater draining every `interval`, raised to [`MIN_INTERVAL`].
    pub fn new(api: Arc<dyn NetworkApi>, interval: Duration) -> Self {
        if interval < MIN_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "Drain interval below minimum, using {}ms",
                MIN_INTERVAL.as_millis()
            );
        }
        let interval = interval.max(MIN_INTERVAL);
        Self {
            queue: Arc::new(PendingQueue::new()),
            api,
            routes: None,
            interval,
        }
    }

    /// Check operations against `routes` when they are drained. Operations whose
    /// service is no longer routed to the operation's load balancer resolve as
    /// [`Outcome::Skipped`].
    pub fn with_routing_table(mut self, routes: ServiceRoutingTable) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Queue an operation for the next drain cycle.
    pub fn enqueue(&self, op: Operation) {
        tracing::debug!(
            operation_id = %op.id(),
            service = %op.service(),
            pool = %op.target(),
            kind = %op.kind(),
            ips = op.ips().len(),
            "Operation queued"
        );
        metrics::record_operation_enqueued(op.kind());
        let pending = self.queue.push(op);
        metrics::record_pending_operations(pending);
    }

    /// Drop every pending operation of `service`. Operations already picked up by a
    /// drain cycle are not affected. Returns the number of withdrawn operations.
    pub fn withdraw(&self, service: &ServiceName) -> usize {
        let withdrawn = self.queue.withdraw(service);
        if withdrawn > 0 {
            tracing::info!(service = %service, withdrawn, "Pending operations withdrawn");
            metrics::record_operations_withdrawn(withdrawn);
        }
        metrics::record_pending_operations(self.queue.len());
        withdrawn
    }

    /// Number of operations waiting for the next drain cycle.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Run drain cycles every interval until `shutdown` fires.
    ///
    /// The first cycle runs one interval after start. A cycle in progress when the
    /// shutdown signal arrives finishes; operations still pending afterwards are
    /// discarded and report `Withdrawn`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_secs = self.interval.as_secs_f64(), "Backend pool updater starting");

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.drain_once().await;
                }
                _ = shutdown::wait(&mut shutdown) => {
                    tracing::info!("Backend pool updater received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        let abandoned = self.queue.drain();
        metrics::record_pending_operations(0);
        if !abandoned.is_empty() {
            tracing::warn!(abandoned = abandoned.len(), "Pending operations withdrawn at shutdown");
        }
    }

    /// Run a single drain cycle and wait for every dispatched group to finish.
    pub async fn drain_once(&self) -> DrainReport {
        let drained = self.queue.drain();
        metrics::record_pending_operations(self.queue.len());
        if drained.is_empty() {
            return DrainReport::default();
        }

        let started = Instant::now();
        let mut report = DrainReport {
            drained: drained.len(),
            ..DrainReport::default()
        };

        let groups = self.group(drained, &mut report);

        let mut tasks = JoinSet::new();
        for (load_balancer, pools) in groups {
            for (pool, ops) in pools {
                report.groups += 1;
                tasks.spawn(process_group(
                    self.api.clone(),
                    PoolKey::new(load_balancer.clone(), pool),
                    ops,
                ));
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(_)) => {}
                Ok(Err(_)) => report.failed_groups += 1,
                Err(e) => {
                    // Operations of a panicked group are dropped and report `Withdrawn`.
                    tracing::error!(error = %e, "Backend pool group task aborted");
                    report.failed_groups += 1;
                }
            }
        }

        metrics::record_drain_duration(started.elapsed());
        tracing::debug!(
            drained = report.drained,
            skipped = report.skipped,
            groups = report.groups,
            failed_groups = report.failed_groups,
            "Drain cycle finished"
        );
        report
    }

    fn group(&self, drained: Vec<Operation>, report: &mut DrainReport) -> Groups {
        let mut groups = Groups::new();
        for op in drained {
            if let Some(routes) = &self.routes {
                let still_routed = routes
                    .get(op.service())
                    .is_some_and(|route| route.targets(&op.target().load_balancer));
                if !still_routed {
                    tracing::debug!(
                        operation_id = %op.id(),
                        service = %op.service(),
                        pool = %op.target(),
                        "Service no longer routed to this load balancer, skipping operation"
                    );
                    report.skipped += 1;
                    op.complete(Ok(Outcome::Skipped));
                    continue;
                }
            }

            let target = op.target().clone();
            groups
                .entry(target.load_balancer)
                .or_default()
                .entry(target.pool)
                .or_default()
                .push(op);
        }
        groups
    }
}
