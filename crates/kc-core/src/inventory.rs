//! Cluster inventory.
//!
//! The inventory enumerates cluster names in **lexicographic order**. The
//! selector hands out the first unleased cluster in that order, so
//! allocation is deterministic for a given pool and lease set.

use crate::cluster::Cluster;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Read access to the pool of leasable clusters.
pub trait ClusterInventory: Send + Sync {
    /// Returns every cluster name, sorted lexicographically.
    fn names_in_stable_order(&self) -> Vec<&str>;

    /// Looks up a cluster by name.
    fn by_name(&self, name: &str) -> Option<&Cluster>;
}

/// In-memory inventory keyed by cluster name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterMap {
    clusters: BTreeMap<String, Cluster>,
}

impl ClusterMap {
    /// Creates an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a cluster, returning the previous record.
    pub fn insert(&mut self, cluster: Cluster) -> Option<Cluster> {
        self.clusters.insert(cluster.name.clone(), cluster)
    }

    /// Number of clusters in the pool.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Iterates clusters in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }
}

impl FromIterator<Cluster> for ClusterMap {
    fn from_iter<T: IntoIterator<Item = Cluster>>(iter: T) -> Self {
        let mut map = ClusterMap::new();
        for cluster in iter {
            map.insert(cluster);
        }
        map
    }
}

impl ClusterInventory for ClusterMap {
    fn names_in_stable_order(&self) -> Vec<&str> {
        self.clusters.keys().map(String::as_str).collect()
    }

    fn by_name(&self, name: &str) -> Option<&Cluster> {
        self.clusters.get(name)
    }
}

/// Shared, swappable snapshot of the inventory.
///
/// Readers take an `Arc` to the current map and are unaffected by a
/// concurrent refresh.
pub struct InventoryCache {
    current: RwLock<Arc<ClusterMap>>,
    refreshed_at: RwLock<Option<DateTime<Utc>>>,
}

impl InventoryCache {
    /// Creates a cache seeded with the given inventory.
    pub fn new(map: ClusterMap) -> Self {
        Self {
            current: RwLock::new(Arc::new(map)),
            refreshed_at: RwLock::new(Some(Utc::now())),
        }
    }

    /// Creates a cache that has never been populated.
    pub fn empty() -> Self {
        Self {
            current: RwLock::new(Arc::new(ClusterMap::new())),
            refreshed_at: RwLock::new(None),
        }
    }

    /// Returns the current inventory.
    pub async fn snapshot(&self) -> Arc<ClusterMap> {
        self.current.read().await.clone()
    }

    /// Replaces the inventory with a freshly fetched one.
    pub async fn replace(&self, map: ClusterMap) {
        let count = map.len();
        *self.current.write().await = Arc::new(map);
        *self.refreshed_at.write().await = Some(Utc::now());
        info!(clusters = count, "Cluster inventory replaced");
    }

    /// When the inventory was last populated.
    pub async fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        *self.refreshed_at.read().await
    }
}

impl Default for InventoryCache {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterAuth;

    fn cluster(name: &str) -> Cluster {
        Cluster::new(name, format!("https://{}.example", name), ClusterAuth::default())
    }

    #[test]
    fn test_names_are_lexicographic_regardless_of_insert_order() {
        let map: ClusterMap = ["gamma", "alpha", "beta"].into_iter().map(cluster).collect();
        assert_eq!(map.names_in_stable_order(), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_by_name() {
        let map: ClusterMap = ["alpha"].into_iter().map(cluster).collect();
        assert_eq!(
            map.by_name("alpha").map(|c| c.endpoint.as_str()),
            Some("https://alpha.example")
        );
        assert!(map.by_name("missing").is_none());
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut map = ClusterMap::new();
        assert!(map.insert(cluster("alpha")).is_none());
        let mut updated = cluster("alpha");
        updated.endpoint = "https://10.1.1.1".to_string();
        assert!(map.insert(updated).is_some());
        assert_eq!(map.len(), 1);
        assert_eq!(map.by_name("alpha").unwrap().endpoint, "https://10.1.1.1");
    }

    #[tokio::test]
    async fn test_cache_replace_keeps_old_snapshots_intact() {
        let cache = InventoryCache::empty();
        assert!(cache.refreshed_at().await.is_none());

        let before = cache.snapshot().await;
        cache
            .replace(["alpha", "beta"].into_iter().map(cluster).collect())
            .await;

        assert!(before.is_empty());
        assert_eq!(cache.snapshot().await.len(), 2);
        assert!(cache.refreshed_at().await.is_some());
    }
}
