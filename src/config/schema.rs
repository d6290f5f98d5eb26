//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::membership::{IpFamily, ServiceName, ServiceNameError, ServiceRoute};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PoolSyncConfig {
    /// Drain loop settings.
    pub reconciler: ReconcilerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Load balancers and their initial backend pools.
    pub load_balancers: Vec<LoadBalancerConfig>,

    /// Locally routed services.
    pub services: Vec<ServiceConfig>,

    /// Known nodes and their private IPs.
    pub nodes: Vec<NodeConfig>,
}

/// Drain loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Seconds between drain cycles.
    pub update_interval_secs: u64,
}

impl ReconcilerConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when RUST_LOG is unset (e.g. "info", "backend_pool_sync=debug").
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A load balancer and the pools it starts with.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoadBalancerConfig {
    pub name: String,

    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

/// Initial state of a backend pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    pub name: String,

    #[serde(default)]
    pub addresses: Vec<IpAddr>,
}

/// A locally routed service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// "namespace/name".
    pub name: String,

    /// Load balancer the service is assigned to.
    pub load_balancer: String,

    #[serde(default)]
    pub ip_family: IpFamily,
}

impl ServiceConfig {
    pub fn service_name(&self) -> Result<ServiceName, ServiceNameError> {
        self.name.parse()
    }

    pub fn route(&self) -> ServiceRoute {
        ServiceRoute::new(self.load_balancer.clone(), self.ip_family)
    }
}

/// A node and its private IPs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    pub name: String,

    #[serde(default)]
    pub ips: Vec<IpAddr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolSyncConfig::default();
        assert_eq!(config.reconciler.update_interval(), Duration::from_secs(30));
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(!config.observability.metrics_enabled);
        assert!(config.services.is_empty());
    }

    #[test]
    fn test_full_document() {
        let config: PoolSyncConfig = toml::from_str(
            r#"
            [reconciler]
            update_interval_secs = 5

            [observability]
            log_format = "json"

            [[load_balancers]]
            name = "lb1"

            [[load_balancers.pools]]
            name = "test-svc1"
            addresses = ["10.0.0.1"]

            [[services]]
            name = "test/svc1"
            load_balancer = "lb1"

            [[services]]
            name = "test/svc2"
            load_balancer = "lb1"
            ip_family = "IPv6"

            [[nodes]]
            name = "node1"
            ips = ["10.0.0.1", "fd00::1"]
            "#,
        )
        .unwrap();

        assert_eq!(config.reconciler.update_interval_secs, 5);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.load_balancers[0].pools[0].addresses.len(), 1);
        assert_eq!(config.services[0].ip_family, IpFamily::Ipv4);
        assert_eq!(config.services[1].route(), ServiceRoute::new("lb1", IpFamily::Ipv6));
        assert_eq!(config.services[1].service_name().unwrap(), ServiceName::new("test", "svc2"));
        assert_eq!(config.nodes[0].ips.len(), 2);
    }
}
