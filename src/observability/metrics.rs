//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pool_sync_operations_enqueued_total` (counter): operations queued, by kind
//! - `pool_sync_operations_withdrawn_total` (counter): operations withdrawn before a drain
//! - `pool_sync_operations_completed_total` (counter): resolved operations, by result
//! - `pool_sync_remote_calls_total` (counter): control-plane calls, by call and status
//! - `pool_sync_membership_events_total` (counter): membership events, by disposition
//! - `pool_sync_pending_operations` (gauge): queue depth
//! - `pool_sync_drain_duration_seconds` (histogram): drain cycle latency

use std::net::SocketAddr;
use std::time::Duration;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::reconciler::{OperationKind, OperationResult, ReconcileError};

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_operation_enqueued(kind: OperationKind) {
    counter!("pool_sync_operations_enqueued_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_operations_withdrawn(count: usize) {
    counter!("pool_sync_operations_withdrawn_total").increment(count as u64);
}

pub fn record_operation_completed(result: &OperationResult) {
    let label = match result {
        Ok(outcome) => outcome.as_str(),
        Err(ReconcileError::Withdrawn) => "withdrawn",
        Err(_) => "failed",
    };
    counter!("pool_sync_operations_completed_total", "result" => label).increment(1);
}

pub fn record_remote_call(call: &'static str, status: &'static str) {
    counter!("pool_sync_remote_calls_total", "call" => call, "status" => status).increment(1);
}

pub fn record_membership_event(disposition: &'static str) {
    counter!("pool_sync_membership_events_total", "disposition" => disposition).increment(1);
}

pub fn record_pending_operations(pending: usize) {
    gauge!("pool_sync_pending_operations").set(pending as f64);
}

pub fn record_drain_duration(elapsed: Duration) {
    histogram!("pool_sync_drain_duration_seconds").record(elapsed.as_secs_f64());
}
