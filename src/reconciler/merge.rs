//! Pool snapshot merging.

use crate::cloud::{BackendAddress, PoolDefinition};
use crate::reconciler::operation::Operation;
use crate::reconciler::types::OperationKind;

/// Apply `ops` to `snapshot` in submission order and return the desired definition.
///
/// `AddIps` appends an entry for each address not already present; `RemoveIps` drops
/// every entry with a matching address. Both are idempotent. Fields other than the
/// address list are carried over untouched.
pub fn merge(snapshot: &PoolDefinition, ops: &[Operation]) -> PoolDefinition {
    let mut desired = snapshot.clone();
    for op in ops {
        match op.kind() {
            OperationKind::AddIps => {
                for ip in op.ips() {
                    if !desired.contains(ip) {
                        desired.addresses.push(BackendAddress::new(*ip));
                    }
                }
            }
            OperationKind::RemoveIps => {
                desired.addresses.retain(|entry| !op.ips().contains(&entry.ip));
            }
        }
    }
    desired
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use crate::membership::ServiceName;
    use crate::reconciler::types::PoolKey;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn add(ips: &[&str]) -> Operation {
        Operation::add_ips(svc(), PoolKey::new("lb1", "pool1"), ips.iter().map(|s| ip(s))).0
    }

    fn remove(ips: &[&str]) -> Operation {
        Operation::remove_ips(svc(), PoolKey::new("lb1", "pool1"), ips.iter().map(|s| ip(s))).0
    }

    fn svc() -> ServiceName {
        ServiceName::new("ns1", "svc1")
    }

    #[test]
    fn test_add_to_empty_pool() {
        let snapshot = PoolDefinition::new("pool1");
        let desired = merge(&snapshot, &[add(&["10.0.0.1", "10.0.0.2"])]);
        assert_eq!(desired.ips(), vec![ip("10.0.0.1"), ip("10.0.0.2")]);
    }

    #[test]
    fn test_add_then_remove_cancels_out() {
        let snapshot = PoolDefinition::new("pool1");
        let desired = merge(
            &snapshot,
            &[add(&["10.0.0.1", "10.0.0.2"]), remove(&["10.0.0.1", "10.0.0.2"])],
        );
        assert_eq!(desired, snapshot);
    }

    #[test]
    fn test_remove_then_add_keeps_address() {
        let snapshot = PoolDefinition::with_ips("pool1", [ip("10.0.0.1")]);
        let desired = merge(&snapshot, &[remove(&["10.0.0.1"]), add(&["10.0.0.1"])]);
        assert_eq!(desired.ips(), vec![ip("10.0.0.1")]);
    }

    #[test]
    fn test_idempotent_operations() {
        let snapshot = PoolDefinition::with_ips("pool1", [ip("10.0.0.1")]);
        assert_eq!(merge(&snapshot, &[add(&["10.0.0.1"])]), snapshot);
        assert_eq!(merge(&snapshot, &[remove(&["10.0.0.9"])]), snapshot);
    }

    #[test]
    fn test_preserves_existing_entries_and_metadata() {
        let mut snapshot = PoolDefinition::with_ips("pool1", [ip("10.0.0.5"), ip("10.0.0.3")]);
        snapshot.id = Some("/loadBalancers/lb1/backendAddressPools/pool1".into());
        snapshot.location = Some("eastus".into());
        snapshot.addresses[0].name = Some("existing".into());

        let desired = merge(&snapshot, &[add(&["10.0.0.4"]), remove(&["10.0.0.3"])]);
        assert_eq!(desired.id, snapshot.id);
        assert_eq!(desired.location, snapshot.location);
        assert_eq!(desired.ips(), vec![ip("10.0.0.5"), ip("10.0.0.4")]);
        assert_eq!(desired.addresses[0].name.as_deref(), Some("existing"));
        assert_eq!(desired.addresses[1].name, None);
    }

    #[test]
    fn test_submission_order_matters() {
        let snapshot = PoolDefinition::new("pool1");
        let ops = [add(&["10.0.0.1"]), remove(&["10.0.0.1"]), add(&["10.0.0.2"]), add(&["10.0.0.1"])];
        let desired = merge(&snapshot, &ops);
        assert_eq!(desired.ips(), vec![ip("10.0.0.2"), ip("10.0.0.1")]);
    }
}
