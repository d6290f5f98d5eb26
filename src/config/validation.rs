//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (services reference declared load balancers)
//! - Validate value ranges (interval > 0, parsable addresses)
//! - Detect duplicates
//!
//! Returns all validation errors, not just the first.

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::PoolSyncConfig;
use crate::membership::ServiceNameError;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("reconciler.update_interval_secs must be greater than zero")]
    ZeroInterval,

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("duplicate load balancer '{0}'")]
    DuplicateLoadBalancer(String),

    #[error("duplicate pool '{pool}' on load balancer '{load_balancer}'")]
    DuplicatePool { load_balancer: String, pool: String },

    #[error(transparent)]
    ServiceName(#[from] ServiceNameError),

    #[error("duplicate service '{0}'")]
    DuplicateService(String),

    #[error("service '{service}' references unknown load balancer '{load_balancer}'")]
    UnknownLoadBalancer { service: String, load_balancer: String },

    #[error("node entry with an empty name")]
    EmptyNodeName,
}

/// Validate `config`, collecting every problem.
pub fn validate_config(config: &PoolSyncConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.reconciler.update_interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let mut load_balancers = HashSet::new();
    for lb in &config.load_balancers {
        if !load_balancers.insert(lb.name.to_lowercase()) {
            errors.push(ValidationError::DuplicateLoadBalancer(lb.name.clone()));
        }
        let mut pools = HashSet::new();
        for pool in &lb.pools {
            if !pools.insert(pool.name.as_str()) {
                errors.push(ValidationError::DuplicatePool {
                    load_balancer: lb.name.clone(),
                    pool: pool.name.clone(),
                });
            }
        }
    }

    let mut services = HashSet::new();
    for svc in &config.services {
        match svc.service_name() {
            Ok(name) => {
                if !services.insert(name.clone()) {
                    errors.push(ValidationError::DuplicateService(name.to_string()));
                }
            }
            Err(e) => errors.push(e.into()),
        }
        if !load_balancers.contains(&svc.load_balancer.to_lowercase()) {
            errors.push(ValidationError::UnknownLoadBalancer {
                service: svc.name.clone(),
                load_balancer: svc.load_balancer.clone(),
            });
        }
    }

    if config.nodes.iter().any(|n| n.name.trim().is_empty()) {
        errors.push(ValidationError::EmptyNodeName);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
