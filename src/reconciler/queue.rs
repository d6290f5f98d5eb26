//! Pending operation queue.
//!
//! # Responsibilities
//! - Accept operations from any number of producers without blocking on I/O
//! - Hand the whole backlog to the drain loop in one swap
//! - Drop pending operations of a withdrawn service

use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::membership::ServiceName;
use crate::reconciler::operation::Operation;

/// Insertion-ordered buffer of operations not yet picked up by a drain cycle.
#[derive(Debug, Default)]
pub struct PendingQueue {
    ops: Mutex<Vec<Operation>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // The lock only guards Vec bookkeeping, so a panic elsewhere cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, Vec<Operation>> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an operation. Returns the queue length afterwards.
    pub fn push(&self, op: Operation) -> usize {
        let mut ops = self.lock();
        ops.push(op);
        ops.len()
    }

    /// Take every pending operation, leaving the queue empty.
    pub fn drain(&self) -> Vec<Operation> {
        mem::take(&mut *self.lock())
    }

    /// Remove every pending operation of `service`. Returns how many were removed.
    ///
    /// Removed operations are dropped outside the lock; their handles observe
    /// `Withdrawn`.
    pub fn withdraw(&self, service: &ServiceName) -> usize {
        let withdrawn: Vec<Operation> = {
            let mut ops = self.lock();
            let (withdrawn, kept) = mem::take(&mut *ops)
                .into_iter()
                .partition(|op| op.service() == service);
            *ops = kept;
            withdrawn
        };
        for op in &withdrawn {
            tracing::debug!(
                operation_id = %op.id(),
                service = %service,
                pool = %op.target(),
                kind = %op.kind(),
                "Operation withdrawn"
            );
        }
        withdrawn.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
