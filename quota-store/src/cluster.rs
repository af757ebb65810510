use async_trait::async_trait;
use dashmap::DashMap;
use quota_core::QuotaError;
use std::sync::Arc;

/// Resolves a `clusterName` into a client (§5 "multi-cluster dispatch").
/// Every work item carries a cluster name; workers look the client up
/// through this manager rather than holding one client per worker.
#[async_trait]
pub trait ClusterManager<C>: Send + Sync {
    async fn get_cluster(&self, name: &str) -> Result<C, QuotaError>;
}

/// A static registry of pre-constructed clients, keyed by cluster name.
/// Sufficient for the in-memory test double and for deployments where the
/// cluster set is fixed at startup.
pub struct StaticClusterManager<C> {
    clusters: DashMap<String, Arc<C>>,
}

impl<C> StaticClusterManager<C> {
    pub fn new() -> Self {
        Self {
            clusters: DashMap::new(),
        }
    }

    pub fn insert(&self, name: impl Into<String>, client: C) {
        self.clusters.insert(name.into(), Arc::new(client));
    }
}

impl<C> Default for StaticClusterManager<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C: Send + Sync + 'static> ClusterManager<Arc<C>> for StaticClusterManager<C> {
    async fn get_cluster(&self, name: &str) -> Result<Arc<C>, QuotaError> {
        self.clusters
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| QuotaError::UnavailableDependency(format!("unknown cluster {name}")))
    }
}
