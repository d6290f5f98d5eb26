//! Service routing table.
//!
//! # Responsibilities
//! - Record which services are locally routed
//! - Record each local service's load balancer and IP family
//! - Answer lookups from the diff engine and the drain loop concurrently

use std::sync::Arc;

use dashmap::DashMap;

use crate::membership::service::{backend_pool_name, IpFamily, ServiceName};

/// Routing entry of a locally routed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoute {
    /// Load balancer the service's frontend lives on, lowercased.
    pub load_balancer: String,
    pub ip_family: IpFamily,
}

impl ServiceRoute {
    pub fn new(load_balancer: impl Into<String>, ip_family: IpFamily) -> Self {
        Self {
            load_balancer: load_balancer.into().to_lowercase(),
            ip_family,
        }
    }

    /// Load balancer names are compared case-insensitively.
    pub fn targets(&self, load_balancer: &str) -> bool {
        self.load_balancer == load_balancer.to_lowercase()
    }
}

/// Concurrent map of locally routed services. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct ServiceRoutingTable {
    inner: Arc<DashMap<ServiceName, ServiceRoute>>,
}

impl ServiceRoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `service` as locally routed. Returns the previous entry, if any.
    pub fn set_local(&self, service: ServiceName, route: ServiceRoute) -> Option<ServiceRoute> {
        let previous = self.inner.insert(service.clone(), route.clone());
        if previous.as_ref() != Some(&route) {
            tracing::debug!(
                service = %service,
                load_balancer = %route.load_balancer,
                ip_family = %route.ip_family,
                "Service routed locally"
            );
        }
        previous
    }

    /// Forget `service`; it is no longer locally routed.
    pub fn remove(&self, service: &ServiceName) -> Option<ServiceRoute> {
        let removed = self.inner.remove(service).map(|(_, route)| route);
        if removed.is_some() {
            tracing::debug!(service = %service, "Service no longer routed locally");
        }
        removed
    }

    pub fn get(&self, service: &ServiceName) -> Option<ServiceRoute> {
        self.inner.get(service).map(|r| r.value().clone())
    }

    pub fn is_local(&self, service: &ServiceName) -> bool {
        self.inner.contains_key(service)
    }

    /// Target (load balancer, pool) of a local service.
    pub fn backend_pool(&self, service: &ServiceName) -> Option<(String, String)> {
        self.get(service)
            .map(|route| (route.load_balancer, backend_pool_name(service, route.ip_family)))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
