//! Pool definitions and remote error classification.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// HTTP status the control plane uses for a missing resource.
pub const STATUS_NOT_FOUND: u16 = 404;

/// One address entry of a backend pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendAddress {
    /// Remote identifier of the entry. Entries created by the reconciler have none.
    #[serde(default)]
    pub name: Option<String>,
    /// Target IP of the entry.
    pub ip: IpAddr,
}

impl BackendAddress {
    pub fn new(ip: IpAddr) -> Self {
        Self { name: None, ip }
    }
}

/// Remote definition of a backend pool.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolDefinition {
    /// Opaque resource id assigned by the control plane.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Address entries in remote order.
    #[serde(default)]
    pub addresses: Vec<BackendAddress>,
}

impl PoolDefinition {
    /// Create an empty pool definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a pool definition holding `ips` in the given order.
    pub fn with_ips<I>(name: impl Into<String>, ips: I) -> Self
    where
        I: IntoIterator<Item = IpAddr>,
    {
        Self {
            name: name.into(),
            addresses: ips.into_iter().map(BackendAddress::new).collect(),
            ..Self::default()
        }
    }

    /// IPs of all address entries, in remote order.
    pub fn ips(&self) -> Vec<IpAddr> {
        self.addresses.iter().map(|a| a.ip).collect()
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.addresses.iter().any(|a| &a.ip == ip)
    }
}

/// Error returned by the cloud network API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("retriable: {retriable}, status: {status:?}, error: {message}")]
pub struct ApiError {
    /// Whether the control plane considers the failure transient.
    pub retriable: bool,
    /// HTTP status of the failed call, when one was received.
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    /// A transient failure (throttling, 5xx).
    pub fn retriable(message: impl Into<String>) -> Self {
        Self {
            retriable: true,
            status: None,
            message: message.into(),
        }
    }

    /// A failure that must not be retried.
    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            retriable: false,
            status: None,
            message: message.into(),
        }
    }

    /// The addressed resource does not exist.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            retriable: false,
            status: Some(STATUS_NOT_FOUND),
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(STATUS_NOT_FOUND)
    }

    /// Label used for the remote call metric.
    pub fn metric_label(&self) -> &'static str {
        if self.is_not_found() {
            "not_found"
        } else if self.retriable {
            "retriable"
        } else {
            "terminal"
        }
    }
}

/// Result type for network API calls.
pub type ApiResult<T> = Result<T, ApiError>;
