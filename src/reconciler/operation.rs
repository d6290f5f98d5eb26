//! Backend pool operations and their completion handles.
//!
//! An [`Operation`] owns the sending half of a oneshot channel and is consumed when it
//! completes, so it can resolve at most once. Dropping an operation without completing
//! it (withdrawal) closes the channel and its [`OperationHandle`] reports
//! [`ReconcileError::Withdrawn`].

use std::collections::BTreeSet;
use std::net::IpAddr;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::membership::ServiceName;
use crate::reconciler::types::{OperationKind, OperationResult, PoolKey, ReconcileError};

/// A requested mutation of one backend pool.
#[derive(Debug)]
pub struct Operation {
    id: Uuid,
    service: ServiceName,
    target: PoolKey,
    kind: OperationKind,
    ips: BTreeSet<IpAddr>,
    completion: oneshot::Sender<OperationResult>,
}

impl Operation {
    /// Create an operation and the handle its originator waits on.
    pub fn new<I>(
        service: ServiceName,
        target: PoolKey,
        kind: OperationKind,
        ips: I,
    ) -> (Self, OperationHandle)
    where
        I: IntoIterator<Item = IpAddr>,
    {
        let (tx, rx) = oneshot::channel();
        let id = Uuid::new_v4();
        let op = Self {
            id,
            service,
            target,
            kind,
            ips: ips.into_iter().collect(),
            completion: tx,
        };
        (op, OperationHandle { id, rx })
    }

    /// Shorthand for an `AddIps` operation.
    pub fn add_ips<I>(service: ServiceName, target: PoolKey, ips: I) -> (Self, OperationHandle)
    where
        I: IntoIterator<Item = IpAddr>,
    {
        Self::new(service, target, OperationKind::AddIps, ips)
    }

    /// Shorthand for a `RemoveIps` operation.
    pub fn remove_ips<I>(service: ServiceName, target: PoolKey, ips: I) -> (Self, OperationHandle)
    where
        I: IntoIterator<Item = IpAddr>,
    {
        Self::new(service, target, OperationKind::RemoveIps, ips)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    pub fn target(&self) -> &PoolKey {
        &self.target
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn ips(&self) -> &BTreeSet<IpAddr> {
        &self.ips
    }

    /// Resolve the operation. Consumes it, so this happens at most once.
    pub(crate) fn complete(self, result: OperationResult) {
        crate::observability::metrics::record_operation_completed(&result);
        // The originator may have stopped waiting.
        let _ = self.completion.send(result);
    }
}

/// Waiter side of an [`Operation`].
#[derive(Debug)]
pub struct OperationHandle {
    id: Uuid,
    rx: oneshot::Receiver<OperationResult>,
}

impl OperationHandle {
    /// Id of the operation this handle belongs to.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait until the operation reaches a terminal state.
    pub async fn wait(self) -> OperationResult {
        self.rx.await.unwrap_or(Err(ReconcileError::Withdrawn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::types::Outcome;

    fn test_op() -> (Operation, OperationHandle) {
        Operation::add_ips(
            ServiceName::new("ns1", "svc1"),
            PoolKey::new("lb1", "pool1"),
            ["10.0.0.2".parse().unwrap(), "10.0.0.1".parse().unwrap()],
        )
    }

    #[tokio::test]
    async fn test_complete_resolves_handle() {
        let (op, handle) = test_op();
        assert_eq!(op.id(), handle.id());
        assert_eq!(op.kind(), OperationKind::AddIps);
        assert_eq!(op.ips().len(), 2);

        op.complete(Ok(Outcome::Applied));
        assert_eq!(handle.wait().await, Ok(Outcome::Applied));
    }

    #[tokio::test]
    async fn test_dropped_operation_reports_withdrawn() {
        let (op, handle) = test_op();
        drop(op);
        assert_eq!(handle.wait().await, Err(ReconcileError::Withdrawn));
    }

    #[test]
    fn test_complete_without_waiter() {
        let (op, handle) = test_op();
        drop(handle);
        op.complete(Ok(Outcome::Unchanged));
    }
}
