//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! updater / apply / diff engine:
//!     → logging.rs (structured events: load_balancer, pool, service, operation_id)
//!     → metrics.rs (queue depth, operations, remote calls, drain latency)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Metrics go through the `metrics` facade; recording is a no-op until an exporter is installed
//! - Log level from RUST_LOG first, configuration second

pub mod logging;
pub mod metrics;
