//! Inventory refresh.
//!
//! Copies the clusters reported by a [`ClusterSource`] into the shared
//! [`InventoryCache`]. A failed fetch leaves the previous inventory in place.

use crate::traits::{ClusterSource, ConnectorResult};
use kc_core::{ClusterMap, InventoryCache};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, instrument, warn};

/// Keeps an inventory cache in sync with a cluster source.
pub struct InventoryRefresher {
    source: Arc<dyn ClusterSource>,
    cache: Arc<InventoryCache>,
}

impl InventoryRefresher {
    /// Creates a refresher.
    pub fn new(source: Arc<dyn ClusterSource>, cache: Arc<InventoryCache>) -> Self {
        Self { source, cache }
    }

    /// Fetches the pool once and replaces the cache, returning the pool size.
    #[instrument(skip(self), fields(source = %self.source.name()))]
    pub async fn refresh_once(&self) -> ConnectorResult<usize> {
        let clusters = self.source.fetch_clusters().await?;

        let mut map = ClusterMap::new();
        for cluster in clusters {
            let name = cluster.name.clone();
            if map.insert(cluster).is_some() {
                warn!(cluster = %name, "Duplicate cluster name from source, keeping the last one");
            }
        }

        let count = map.len();
        self.cache.replace(map).await;
        counter!("kc_inventory_refreshes_total").increment(1);
        Ok(count)
    }

    /// Spawns a task that refreshes the cache every `interval`.
    ///
    /// The first refresh happens one `interval` from now; callers load the
    /// initial inventory with [`refresh_once`](Self::refresh_once).
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh_once().await {
                    counter!("kc_inventory_refresh_failures_total").increment(1);
                    error!(error = %e, "Inventory refresh failed, keeping previous inventory");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockClusterSource;
    use crate::testing::sample_cluster;
    use kc_core::ClusterInventory;

    #[tokio::test]
    async fn test_refresh_populates_cache() {
        let source = Arc::new(MockClusterSource::new(
            "mock",
            vec![sample_cluster("b"), sample_cluster("a")],
        ));
        let cache = Arc::new(InventoryCache::empty());
        let refresher = InventoryRefresher::new(source.clone(), cache.clone());

        assert_eq!(refresher.refresh_once().await.unwrap(), 2);
        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.names_in_stable_order(), vec!["a", "b"]);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_names_collapse() {
        let mut later = sample_cluster("a");
        later.endpoint = "https://override.test".to_string();
        let source = Arc::new(MockClusterSource::new(
            "mock",
            vec![sample_cluster("a"), later],
        ));
        let cache = Arc::new(InventoryCache::empty());

        let count = InventoryRefresher::new(source, cache.clone())
            .refresh_once()
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(
            cache.snapshot().await.by_name("a").unwrap().endpoint,
            "https://override.test"
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_inventory() {
        let source = Arc::new(MockClusterSource::new("mock", vec![sample_cluster("a")]));
        let cache = Arc::new(InventoryCache::empty());
        let refresher = InventoryRefresher::new(source.clone(), cache.clone());
        refresher.refresh_once().await.unwrap();

        source.set_healthy(false).await;
        assert!(refresher.refresh_once().await.is_err());
        assert_eq!(cache.snapshot().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_refresher_picks_up_changes() {
        let source = Arc::new(MockClusterSource::new("mock", vec![sample_cluster("a")]));
        let cache = Arc::new(InventoryCache::empty());
        let refresher = Arc::new(InventoryRefresher::new(source.clone(), cache.clone()));
        refresher.refresh_once().await.unwrap();
        let handle = refresher.spawn(Duration::from_secs(60));

        // No second fetch right after startup
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(cache.snapshot().await.len(), 1);

        source
            .set_clusters(vec![sample_cluster("a"), sample_cluster("b")])
            .await;
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(source.fetch_count(), 2);
        assert_eq!(cache.snapshot().await.len(), 2);

        handle.abort();
    }
}
