//! Shared utilities for integration tests.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use backend_pool_sync::cloud::{ApiResult, InMemoryNetworkApi, NetworkApi, PoolDefinition};
use backend_pool_sync::membership::ServiceName;
use backend_pool_sync::reconciler::PoolKey;

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[allow(dead_code)]
pub fn ips(list: &[&str]) -> Vec<IpAddr> {
    list.iter().map(|s| ip(s)).collect()
}

#[allow(dead_code)]
pub fn svc1() -> ServiceName {
    "ns1/svc1".parse().unwrap()
}

#[allow(dead_code)]
pub fn pool(lb: &str, name: &str) -> PoolKey {
    PoolKey::new(lb, name)
}

/// In-memory API holding the given empty pools on `lb1`.
#[allow(dead_code)]
pub fn api_with_empty_pools(pools: &[&str]) -> Arc<InMemoryNetworkApi> {
    let api = Arc::new(InMemoryNetworkApi::new());
    for name in pools {
        api.insert_pool("lb1", PoolDefinition::new(*name));
    }
    api
}

/// Network API whose fetches block until released by the test.
#[allow(dead_code)]
pub struct GatedApi {
    pub inner: InMemoryNetworkApi,
    entered: Notify,
    release: Semaphore,
}

#[allow(dead_code)]
impl GatedApi {
    pub fn new(inner: InMemoryNetworkApi) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }

    /// Wait until a fetch is blocked on the gate.
    pub async fn fetch_started(&self) {
        self.entered.notified().await;
    }

    /// Let `n` blocked or future fetches through.
    pub fn release(&self, n: usize) {
        self.release.add_permits(n);
    }
}

#[async_trait]
impl NetworkApi for GatedApi {
    async fn get_backend_pool(&self, load_balancer: &str, pool: &str) -> ApiResult<PoolDefinition> {
        self.entered.notify_one();
        let permit = self.release.acquire().await.expect("gate closed");
        permit.forget();
        self.inner.get_backend_pool(load_balancer, pool).await
    }

    async fn create_or_update_backend_pool(
        &self,
        load_balancer: &str,
        pool: &str,
        definition: PoolDefinition,
    ) -> ApiResult<()> {
        self.inner
            .create_or_update_backend_pool(load_balancer, pool, definition)
            .await
    }
}
