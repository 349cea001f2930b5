//! Mock cluster source for testing.

use crate::traits::{ClusterSource, Connector, ConnectorError, ConnectorHealth, ConnectorResult};
use async_trait::async_trait;
use kc_core::Cluster;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mock cluster source whose pool and health can be changed at runtime.
pub struct MockClusterSource {
    name: String,
    clusters: Arc<RwLock<Vec<Cluster>>>,
    healthy: Arc<RwLock<bool>>,
    fetches: AtomicUsize,
}

impl MockClusterSource {
    /// Creates a mock source serving `clusters`.
    pub fn new(name: &str, clusters: Vec<Cluster>) -> Self {
        Self {
            name: name.to_string(),
            clusters: Arc::new(RwLock::new(clusters)),
            healthy: Arc::new(RwLock::new(true)),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replaces the served pool.
    pub async fn set_clusters(&self, clusters: Vec<Cluster>) {
        *self.clusters.write().await = clusters;
    }

    /// Sets the health status; an unhealthy mock fails every fetch.
    pub async fn set_healthy(&self, healthy: bool) {
        *self.healthy.write().await = healthy;
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockClusterSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn connector_type(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        if *self.healthy.read().await {
            Ok(ConnectorHealth::Healthy)
        } else {
            Ok(ConnectorHealth::Unhealthy("Mock unhealthy".to_string()))
        }
    }
}

#[async_trait]
impl ClusterSource for MockClusterSource {
    async fn fetch_clusters(&self) -> ConnectorResult<Vec<Cluster>> {
        if !*self.healthy.read().await {
            return Err(ConnectorError::ConnectionFailed("Mock unhealthy".to_string()));
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.clusters.read().await.clone())
    }
}
