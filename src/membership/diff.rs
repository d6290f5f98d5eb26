//! Endpoint membership diffing.
//!
//! # Responsibilities
//! - Drop events that carry no service or whose service is not locally routed
//! - Resolve old and new node sets to IPs of the service's family
//! - Emit one AddIps and/or one RemoveIps operation for the service's pool
//! - Apply node and service table updates from the event stream

use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::membership::events::{ClusterEvent, MembershipEvent};
use crate::membership::nodes::NodeIpResolver;
use crate::membership::routing::{ServiceRoute, ServiceRoutingTable};
use crate::membership::service::backend_pool_name;
use crate::observability::metrics;
use crate::reconciler::{BackendPoolUpdater, Operation, OperationHandle, PoolKey};

/// Turns membership changes into backend pool operations.
#[derive(Clone)]
pub struct EndpointDiffEngine {
    routes: ServiceRoutingTable,
    nodes: NodeIpResolver,
    updater: BackendPoolUpdater,
}

impl EndpointDiffEngine {
    pub fn new(routes: ServiceRoutingTable, nodes: NodeIpResolver, updater: BackendPoolUpdater) -> Self {
        Self { routes, nodes, updater }
    }

    pub fn routes(&self) -> &ServiceRoutingTable {
        &self.routes
    }

    pub fn nodes(&self) -> &NodeIpResolver {
        &self.nodes
    }

    pub fn updater(&self) -> &BackendPoolUpdater {
        &self.updater
    }

    /// Compute the operations for `event` without queueing them.
    pub fn plan(&self, event: &MembershipEvent) -> Vec<(Operation, OperationHandle)> {
        let Some(service) = &event.service else {
            tracing::trace!("Endpoint change without owning service, ignoring");
            metrics::record_membership_event("no_service");
            return Vec::new();
        };
        let Some(route) = self.routes.get(service) else {
            tracing::trace!(service = %service, "Service is not routed locally, ignoring endpoint change");
            metrics::record_membership_event("not_local");
            return Vec::new();
        };

        let family = Some(route.ip_family);
        let old_ips = self.nodes.resolve(event.old_nodes.iter().map(String::as_str), family);
        let new_ips = self.nodes.resolve(event.new_nodes.iter().map(String::as_str), family);

        let added: BTreeSet<IpAddr> = new_ips.difference(&old_ips).copied().collect();
        let removed: BTreeSet<IpAddr> = old_ips.difference(&new_ips).copied().collect();

        let target = PoolKey::new(
            route.load_balancer.clone(),
            backend_pool_name(service, route.ip_family),
        );

        let mut ops = Vec::new();
        if !added.is_empty() {
            tracing::debug!(service = %service, pool = %target, ips = ?added, "Endpoint IPs added");
            ops.push(Operation::add_ips(service.clone(), target.clone(), added));
        }
        if !removed.is_empty() {
            tracing::debug!(service = %service, pool = %target, ips = ?removed, "Endpoint IPs removed");
            ops.push(Operation::remove_ips(service.clone(), target, removed));
        }

        metrics::record_membership_event(if ops.is_empty() { "unchanged" } else { "changed" });
        ops
    }

    /// Compute and queue the operations for `event`.
    pub fn handle(&self, event: &MembershipEvent) -> Vec<OperationHandle> {
        self.plan(event)
            .into_iter()
            .map(|(op, handle)| {
                self.updater.enqueue(op);
                handle
            })
            .collect()
    }

    /// Dispatch one event from the cluster stream.
    ///
    /// Deleting a service, or moving it to another load balancer or IP family,
    /// withdraws its pending operations.
    pub fn handle_cluster_event(&self, event: ClusterEvent) -> Vec<OperationHandle> {
        match event {
            ClusterEvent::Endpoints(membership) => self.handle(&membership),
            ClusterEvent::Node { name, ips } => {
                self.nodes.set_node_ips(&name, ips);
                Vec::new()
            }
            ClusterEvent::NodeDeleted { name } => {
                self.nodes.remove_node(&name);
                Vec::new()
            }
            ClusterEvent::Service {
                name,
                load_balancer,
                ip_family,
            } => {
                let route = ServiceRoute::new(load_balancer, ip_family);
                let previous = self.routes.set_local(name.clone(), route.clone());
                if previous.is_some_and(|p| p != route) {
                    self.updater.withdraw(&name);
                }
                Vec::new()
            }
            ClusterEvent::ServiceDeleted { name } => {
                self.routes.remove(&name);
                self.updater.withdraw(&name);
                Vec::new()
            }
        }
    }
}
