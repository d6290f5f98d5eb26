//! Node private IP table.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;

use crate::membership::service::IpFamily;

/// Concurrent map of node name → private IPs. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct NodeIpResolver {
    inner: Arc<DashMap<String, BTreeSet<IpAddr>>>,
}

impl NodeIpResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known IPs of `node`.
    pub fn set_node_ips<I>(&self, node: &str, ips: I)
    where
        I: IntoIterator<Item = IpAddr>,
    {
        let ips: BTreeSet<IpAddr> = ips.into_iter().collect();
        tracing::debug!(node = %node, ips = ?ips, "Node IPs updated");
        self.inner.insert(node.to_lowercase(), ips);
    }

    pub fn remove_node(&self, node: &str) -> Option<BTreeSet<IpAddr>> {
        self.inner.remove(&node.to_lowercase()).map(|(_, ips)| ips)
    }

    /// Known IPs of `node`; empty when the node is unknown.
    pub fn node_ips(&self, node: &str) -> BTreeSet<IpAddr> {
        self.inner
            .get(&node.to_lowercase())
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Union of the IPs of `nodes`, optionally restricted to one family.
    /// Unknown nodes contribute nothing.
    pub fn resolve<'a, I>(&self, nodes: I, family: Option<IpFamily>) -> BTreeSet<IpAddr>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut resolved = BTreeSet::new();
        for node in nodes {
            if let Some(ips) = self.inner.get(&node.to_lowercase()) {
                resolved.extend(
                    ips.iter()
                        .filter(|ip| family.map_or(true, |f| f.matches(ip)))
                        .copied(),
                );
            }
        }
        resolved
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
