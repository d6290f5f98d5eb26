//! In-memory network API.
//!
//! # Responsibilities
//! - Hold backend pools keyed by (load balancer, pool)
//! - Record every call for inspection
//! - Inject failures for individual pools

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cloud::types::{ApiError, ApiResult, PoolDefinition};
use crate::cloud::NetworkApi;

type PoolKey = (String, String);

/// A call observed by [`InMemoryNetworkApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Get {
        load_balancer: String,
        pool: String,
    },
    Update {
        load_balancer: String,
        pool: String,
        definition: PoolDefinition,
    },
}

impl ApiCall {
    pub fn is_update(&self) -> bool {
        matches!(self, ApiCall::Update { .. })
    }

    /// Whether this call addressed `pool` on `load_balancer`.
    pub fn targets(&self, lb: &str, name: &str) -> bool {
        match self {
            ApiCall::Get { load_balancer, pool } | ApiCall::Update { load_balancer, pool, .. } => {
                load_balancer.to_lowercase() == lb.to_lowercase() && pool == name
            }
        }
    }
}

/// Concurrency-safe stand-in for the cloud network API.
#[derive(Debug, Default)]
pub struct InMemoryNetworkApi {
    pools: DashMap<PoolKey, PoolDefinition>,
    get_failures: DashMap<PoolKey, VecDeque<ApiError>>,
    update_failures: DashMap<PoolKey, VecDeque<ApiError>>,
    calls: Mutex<Vec<ApiCall>>,
}

// Load balancer names are case-insensitive, pool names are not.
fn key(load_balancer: &str, pool: &str) -> PoolKey {
    (load_balancer.to_lowercase(), pool.to_string())
}

impl InMemoryNetworkApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a pool.
    pub fn insert_pool(&self, load_balancer: &str, definition: PoolDefinition) {
        self.pools.insert(key(load_balancer, &definition.name), definition);
    }

    /// Current definition of a pool, if it exists.
    pub fn pool(&self, load_balancer: &str, pool: &str) -> Option<PoolDefinition> {
        self.pools.get(&key(load_balancer, pool)).map(|p| p.value().clone())
    }

    /// Every pool, keyed by "load_balancer/pool".
    pub fn snapshot(&self) -> BTreeMap<String, PoolDefinition> {
        self.pools
            .iter()
            .map(|entry| {
                let (lb, pool) = entry.key();
                (format!("{lb}/{pool}"), entry.value().clone())
            })
            .collect()
    }

    /// Fail the next fetch of `pool` with `error`. Queued failures are consumed in order.
    pub fn fail_next_get(&self, load_balancer: &str, pool: &str, error: ApiError) {
        self.get_failures.entry(key(load_balancer, pool)).or_default().push_back(error);
    }

    /// Fail the next update of `pool` with `error`.
    pub fn fail_next_update(&self, load_balancer: &str, pool: &str, error: ApiError) {
        self.update_failures.entry(key(load_balancer, pool)).or_default().push_back(error);
    }

    /// All calls observed so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of fetches issued against a pool.
    pub fn get_count(&self, load_balancer: &str, pool: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| !c.is_update() && c.targets(load_balancer, pool))
            .count()
    }

    /// Number of updates issued against a pool.
    pub fn update_count(&self, load_balancer: &str, pool: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.is_update() && c.targets(load_balancer, pool))
            .count()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    fn take_failure(failures: &DashMap<PoolKey, VecDeque<ApiError>>, key: &PoolKey) -> Option<ApiError> {
        failures.get_mut(key).and_then(|mut queue| queue.pop_front())
    }
}

#[async_trait]
impl NetworkApi for InMemoryNetworkApi {
    async fn get_backend_pool(&self, load_balancer: &str, pool: &str) -> ApiResult<PoolDefinition> {
        self.record(ApiCall::Get {
            load_balancer: load_balancer.to_string(),
            pool: pool.to_string(),
        });

        let key = key(load_balancer, pool);
        if let Some(err) = Self::take_failure(&self.get_failures, &key) {
            return Err(err);
        }

        self.pools
            .get(&key)
            .map(|p| p.value().clone())
            .ok_or_else(|| ApiError::not_found(format!("backend pool {load_balancer}/{pool} not found")))
    }

    async fn create_or_update_backend_pool(
        &self,
        load_balancer: &str,
        pool: &str,
        definition: PoolDefinition,
    ) -> ApiResult<()> {
        self.record(ApiCall::Update {
            load_balancer: load_balancer.to_string(),
            pool: pool.to_string(),
            definition: definition.clone(),
        });

        let key = key(load_balancer, pool);
        if let Some(err) = Self::take_failure(&self.update_failures, &key) {
            return Err(err);
        }

        self.pools.insert(key, definition);
        Ok(())
    }
}
