//! Cluster events consumed by the membership subsystem.

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::membership::service::{IpFamily, ServiceName};

/// Change in the set of nodes carrying endpoints of a service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MembershipEvent {
    /// Owning service. Endpoint sets that belong to no service carry `None`.
    #[serde(default)]
    pub service: Option<ServiceName>,
    #[serde(default)]
    pub old_nodes: BTreeSet<String>,
    #[serde(default)]
    pub new_nodes: BTreeSet<String>,
}

impl MembershipEvent {
    pub fn new<O, N>(service: Option<ServiceName>, old_nodes: O, new_nodes: N) -> Self
    where
        O: IntoIterator,
        O::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            service,
            old_nodes: old_nodes.into_iter().map(Into::into).collect(),
            new_nodes: new_nodes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Event fed to the simulator, one JSON object per line, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClusterEvent {
    /// Endpoint membership of a service changed.
    Endpoints(MembershipEvent),

    /// A node was added or its addresses changed.
    Node {
        name: String,
        #[serde(default)]
        ips: Vec<IpAddr>,
    },

    NodeDeleted { name: String },

    /// A service became (or stayed) locally routed.
    Service {
        name: ServiceName,
        load_balancer: String,
        #[serde(default)]
        ip_family: IpFamily,
    },

    /// A service stopped being locally routed or was deleted.
    ServiceDeleted { name: ServiceName },
}
