//! Service identity and IP family.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing a service name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceNameError {
    #[error("service name '{0}' must have the form namespace/name")]
    MissingSeparator(String),

    #[error("service name '{0}' has an empty namespace or name")]
    EmptyComponent(String),
}

/// Namespaced service identity, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName {
    namespace: String,
    name: String,
}

impl ServiceName {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_lowercase(),
            name: name.to_lowercase(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ServiceName {
    type Err = ServiceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, name) = s
            .split_once('/')
            .ok_or_else(|| ServiceNameError::MissingSeparator(s.to_string()))?;
        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(ServiceNameError::EmptyComponent(s.to_string()));
        }
        Ok(Self::new(namespace, name))
    }
}

impl TryFrom<String> for ServiceName {
    type Error = ServiceNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServiceName> for String {
    fn from(service: ServiceName) -> Self {
        service.to_string()
    }
}

/// IP family a service's load-balancer frontend is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IpFamily {
    #[default]
    #[serde(rename = "IPv4", alias = "ipv4")]
    Ipv4,
    #[serde(rename = "IPv6", alias = "ipv6")]
    Ipv6,
}

impl IpFamily {
    /// Whether `ip` belongs to this family.
    pub fn matches(self, ip: &IpAddr) -> bool {
        match self {
            IpFamily::Ipv4 => ip.is_ipv4(),
            IpFamily::Ipv6 => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::Ipv4 => f.write_str("IPv4"),
            IpFamily::Ipv6 => f.write_str("IPv6"),
        }
    }
}

/// Name of the dedicated backend pool of a locally routed service.
///
/// `ns/svc` maps to `ns-svc` for IPv4 and `ns-svc-ipv6` for IPv6.
pub fn backend_pool_name(service: &ServiceName, family: IpFamily) -> String {
    match family {
        IpFamily::Ipv4 => format!("{}-{}", service.namespace, service.name),
        IpFamily::Ipv6 => format!("{}-{}-ipv6", service.namespace, service.name),
    }
}
