//! Reconciler types and error definitions.

use std::fmt;

use thiserror::Error;

use crate::cloud::ApiError;

/// Mutation requested by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Ensure the addresses are members of the pool.
    AddIps,
    /// Ensure the addresses are not members of the pool.
    RemoveIps,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::AddIps => "add_ips",
            OperationKind::RemoveIps => "remove_ips",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a successfully resolved operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The merged pool was written to the control plane.
    Applied,
    /// The pool already reflected every operation of the group; no update was issued.
    Unchanged,
    /// The pool does not exist remotely. Nothing was reconciled, and the operation
    /// still counts as a success.
    PoolNotFound,
    /// The service was no longer routed to this load balancer when the queue drained.
    Skipped,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::Unchanged => "unchanged",
            Outcome::PoolNotFound => "pool_not_found",
            Outcome::Skipped => "skipped",
        }
    }
}

/// Errors delivered to an operation's waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Fetching the pool snapshot failed terminally.
    #[error("failed to get backend pool {pool}: {source}")]
    Fetch { pool: PoolKey, source: ApiError },

    /// Writing the merged pool failed terminally.
    #[error("failed to update backend pool {pool}: {source}")]
    Update { pool: PoolKey, source: ApiError },

    /// The operation was discarded before it could be applied, by withdrawal or
    /// because the reconciler went away.
    #[error("operation withdrawn before it was applied")]
    Withdrawn,
}

impl ReconcileError {
    /// The remote error behind this failure, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ReconcileError::Fetch { source, .. } | ReconcileError::Update { source, .. } => Some(source),
            ReconcileError::Withdrawn => None,
        }
    }
}

/// Terminal result of an operation.
pub type OperationResult = Result<Outcome, ReconcileError>;

/// A (load balancer, pool) pair; the unit of batching.
///
/// The load balancer name is lowercased so differently cased references to one
/// load balancer land in the same group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey {
    pub load_balancer: String,
    pub pool: String,
}

impl PoolKey {
    pub fn new(load_balancer: impl Into<String>, pool: impl Into<String>) -> Self {
        Self {
            load_balancer: load_balancer.into().to_lowercase(),
            pool: pool.into(),
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.load_balancer, self.pool)
    }
}

/// Summary of one drain cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Operations taken off the pending queue.
    pub drained: usize,
    /// Operations resolved as `Skipped` without reaching a pool group.
    pub skipped: usize,
    /// (load balancer, pool) groups dispatched.
    pub groups: usize,
    /// Groups whose operations resolved with an error.
    pub failed_groups: usize,
}
