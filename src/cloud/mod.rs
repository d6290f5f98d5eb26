//! Cloud network API boundary.
//!
//! # Data Flow
//! ```text
//! reconciler (per pool group)
//!     → NetworkApi::get_backend_pool (snapshot)
//!     → merge in memory
//!     → NetworkApi::create_or_update_backend_pool (desired state)
//! ```
//!
//! # Design Decisions
//! - The reconciler only ever sees the trait; generated bindings live elsewhere
//! - Errors carry their own retry classification (types.rs)
//! - memory.rs backs the simulator binary and the test suite

pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use memory::{ApiCall, InMemoryNetworkApi};
pub use types::{ApiError, ApiResult, BackendAddress, PoolDefinition};

/// Backend pool calls consumed from the cloud control plane.
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// Fetch the current definition of `pool` on `load_balancer`.
    async fn get_backend_pool(&self, load_balancer: &str, pool: &str) -> ApiResult<PoolDefinition>;

    /// Replace the definition of `pool` on `load_balancer`.
    async fn create_or_update_backend_pool(
        &self,
        load_balancer: &str,
        pool: &str,
        definition: PoolDefinition,
    ) -> ApiResult<()>;
}
