//! Fetch, merge and apply for one pool group.
//!
//! # Responsibilities
//! - Fetch the pool snapshot once per group
//! - Merge every operation of the group in submission order
//! - Write the result, skipping the call when nothing changed
//! - Classify failures and spend the group's single retry
//! - Resolve every operation of the group exactly once
//!
//! # Retry Policy
//! ```text
//! fetch  → not found      → PoolNotFound (success, no update)
//!        → retriable      → one retry of the whole fetch/merge/apply sequence
//!        → terminal       → Fetch error
//! update → retriable      → re-fetch, re-merge the same operations, re-apply
//!        → terminal       → Update error
//! ```
//! The retry budget is one per group: a retriable failure after the retry is terminal.

use std::sync::Arc;

use crate::cloud::{ApiError, NetworkApi};
use crate::observability::metrics;
use crate::reconciler::merge::merge;
use crate::reconciler::operation::Operation;
use crate::reconciler::types::{OperationResult, Outcome, PoolKey, ReconcileError};

/// Maximum number of fetch/merge/apply attempts per group.
pub const MAX_ATTEMPTS: u32 = 2;

/// Reconcile one pool group and resolve all of its operations with the result.
pub async fn process_group(api: Arc<dyn NetworkApi>, key: PoolKey, ops: Vec<Operation>) -> OperationResult {
    let result = reconcile_pool(api.as_ref(), &key, &ops).await;

    match &result {
        Ok(outcome) => tracing::info!(
            load_balancer = %key.load_balancer,
            pool = %key.pool,
            operations = ops.len(),
            outcome = outcome.as_str(),
            "Backend pool reconciled"
        ),
        Err(e) => tracing::error!(
            load_balancer = %key.load_balancer,
            pool = %key.pool,
            operations = ops.len(),
            error = %e,
            "Backend pool reconciliation failed"
        ),
    }

    for op in ops {
        tracing::debug!(
            operation_id = %op.id(),
            service = %op.service(),
            kind = %op.kind(),
            "Resolving operation"
        );
        op.complete(result.clone());
    }
    result
}

/// Run the fetch/merge/apply sequence for `ops` against `key`.
///
/// Does not resolve the operations; see [`process_group`].
pub async fn reconcile_pool(api: &dyn NetworkApi, key: &PoolKey, ops: &[Operation]) -> OperationResult {
    let mut attempt = 1;
    loop {
        let snapshot = match api.get_backend_pool(&key.load_balancer, &key.pool).await {
            Ok(snapshot) => {
                metrics::record_remote_call("get", "ok");
                snapshot
            }
            Err(e) => {
                metrics::record_remote_call("get", e.metric_label());
                if e.is_not_found() {
                    // The pool is gone; there is nothing left to reconcile against.
                    tracing::warn!(
                        load_balancer = %key.load_balancer,
                        pool = %key.pool,
                        "Backend pool not found, dropping its operations"
                    );
                    return Ok(Outcome::PoolNotFound);
                }
                if should_retry(&e, attempt) {
                    log_retry(key, "get", &e, attempt);
                    attempt += 1;
                    continue;
                }
                return Err(ReconcileError::Fetch {
                    pool: key.clone(),
                    source: e,
                });
            }
        };

        let desired = merge(&snapshot, ops);
        if desired == snapshot {
            tracing::debug!(
                load_balancer = %key.load_balancer,
                pool = %key.pool,
                "Backend pool already up to date, skipping update"
            );
            return Ok(Outcome::Unchanged);
        }

        tracing::debug!(
            load_balancer = %key.load_balancer,
            pool = %key.pool,
            before = snapshot.addresses.len(),
            after = desired.addresses.len(),
            attempt,
            "Updating backend pool"
        );

        match api
            .create_or_update_backend_pool(&key.load_balancer, &key.pool, desired)
            .await
        {
            Ok(()) => {
                metrics::record_remote_call("update", "ok");
                return Ok(Outcome::Applied);
            }
            Err(e) => {
                metrics::record_remote_call("update", e.metric_label());
                if should_retry(&e, attempt) {
                    log_retry(key, "update", &e, attempt);
                    attempt += 1;
                    continue;
                }
                return Err(ReconcileError::Update {
                    pool: key.clone(),
                    source: e,
                });
            }
        }
    }
}

fn should_retry(error: &ApiError, attempt: u32) -> bool {
    error.retriable && attempt < MAX_ATTEMPTS
}

fn log_retry(key: &PoolKey, call: &'static str, error: &ApiError, attempt: u32) {
    tracing::warn!(
        load_balancer = %key.load_balancer,
        pool = %key.pool,
        call,
        attempt,
        error = %error,
        "Retriable backend pool error, retrying with a fresh snapshot"
    );
}
