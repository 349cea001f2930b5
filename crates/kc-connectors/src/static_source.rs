//! Cluster source backed by a fixed list, typically from the config file.

use crate::traits::{ClusterSource, Connector, ConnectorHealth, ConnectorResult};
use async_trait::async_trait;
use kc_core::Cluster;

/// Serves a fixed set of clusters.
pub struct StaticClusterSource {
    name: String,
    clusters: Vec<Cluster>,
}

impl StaticClusterSource {
    /// Creates a static source.
    pub fn new(name: impl Into<String>, clusters: Vec<Cluster>) -> Self {
        Self {
            name: name.into(),
            clusters,
        }
    }
}

#[async_trait]
impl Connector for StaticClusterSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn connector_type(&self) -> &str {
        "static"
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        if self.clusters.is_empty() {
            Ok(ConnectorHealth::Degraded("No clusters configured".to_string()))
        } else {
            Ok(ConnectorHealth::Healthy)
        }
    }
}

#[async_trait]
impl ClusterSource for StaticClusterSource {
    async fn fetch_clusters(&self) -> ConnectorResult<Vec<Cluster>> {
        Ok(self.clusters.clone())
    }
}
