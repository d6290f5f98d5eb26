//! Batched backend pool synchronization for locally routed services.

pub mod cloud;
pub mod config;
pub mod lifecycle;
pub mod membership;
pub mod observability;
pub mod reconciler;

pub use cloud::{InMemoryNetworkApi, NetworkApi};
pub use config::PoolSyncConfig;
pub use lifecycle::Shutdown;
pub use membership::EndpointDiffEngine;
pub use reconciler::BackendPoolUpdater;
