//! Batched backend pool reconciliation.
//!
//! # Data Flow
//! ```text
//! producers (diff engine, ...)
//!     → updater.rs enqueue → queue.rs (pending, insertion order)
//!
//! every interval (updater.rs):
//!     swap queue with an empty one
//!     → drop operations of services no longer routed here (Skipped)
//!     → group by load balancer, then pool
//!     → one task per group (apply.rs):
//!         fetch snapshot → merge.rs → update → single retry on retriable errors
//!     → every operation resolved through its oneshot (operation.rs)
//! ```
//!
//! # Design Decisions
//! - The queue is swapped out whole, so a pool's operations for a cycle land in one group
//! - Groups run concurrently; work inside a group is strictly sequential
//! - A cycle finishes before the next tick, so at most one update per pool is in flight
//! - A missing pool counts as success: there is nothing left to reconcile
//! - Failures never leave their group and never stop the loop

pub mod apply;
pub mod merge;
pub mod operation;
pub mod queue;
pub mod types;
pub mod updater;

pub use operation::{Operation, OperationHandle};
pub use types::{DrainReport, OperationKind, OperationResult, Outcome, PoolKey, ReconcileError};
pub use updater::BackendPoolUpdater;
