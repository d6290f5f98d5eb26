//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PoolSyncConfig (validated, immutable)
//!     → seeds the routing table, node table and simulated pools
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Service names stay strings until validation so every problem is reported at once

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    LoadBalancerConfig, LogFormat, NodeConfig, ObservabilityConfig, PoolConfig, PoolSyncConfig,
    ReconcilerConfig, ServiceConfig,
};
pub use validation::{validate_config, ValidationError};
