//! Allocation service.
//!
//! The [`Allocator`] ties the inventory, the lease store and the kubeconfig
//! materializer together into the "give me a cluster" operation.

use crate::error::{AllocationError, AllocationResult};
use crate::inventory::{ClusterInventory, InventoryCache};
use crate::kubeconfig::{build_access_config, encode_access_config};
use crate::lease::{Lease, LeaseIndex, LeaseStore, MAX_LEASE_SECS};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Allocation limits.
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    /// Longest lease a caller may request.
    pub max_lease_duration: Duration,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_lease_duration: Duration::from_secs(4 * 60 * 60),
        }
    }
}

/// A granted lease together with the credentials for its cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseGrant {
    /// Token used to release the lease.
    pub token: Uuid,
    /// Name of the leased cluster.
    pub cluster_name: String,
    /// API server address of the leased cluster.
    pub endpoint: String,
    /// Base64-encoded kubeconfig JSON.
    pub kube_config: String,
    /// When the lease expires.
    pub expires_at: DateTime<Utc>,
}

/// Inventory entry annotated with its lease state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub name: String,
    pub endpoint: String,
    pub leased: bool,
}

/// Hands out clusters and takes them back.
pub struct Allocator {
    inventory: Arc<InventoryCache>,
    leases: Arc<dyn LeaseStore>,
    config: AllocatorConfig,
}

impl Allocator {
    /// Creates an allocator over the given inventory and lease store.
    pub fn new(
        inventory: Arc<InventoryCache>,
        leases: Arc<dyn LeaseStore>,
        config: AllocatorConfig,
    ) -> Self {
        Self {
            inventory,
            leases,
            config,
        }
    }

    /// Returns the allocation limits.
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Returns the inventory cache.
    pub fn inventory(&self) -> &Arc<InventoryCache> {
        &self.inventory
    }

    /// Leases the first free cluster for `duration_secs` seconds.
    ///
    /// The lease is only kept if its kubeconfig could be encoded; on an
    /// encoding failure the claim is released before the error is returned.
    #[instrument(skip(self))]
    pub async fn allocate(&self, duration_secs: u64) -> AllocationResult<LeaseGrant> {
        let duration = self.validate_duration(duration_secs)?;
        let inventory = self.inventory.snapshot().await;

        let (cluster, lease) = match self
            .leases
            .claim_first_unleased(inventory.as_ref(), duration)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                if e.is_exhausted() {
                    counter!("kc_allocation_exhausted_total").increment(1);
                    warn!(pool_size = inventory.len(), "No unleased cluster available");
                }
                return Err(e);
            }
        };

        let encoded = encode_access_config(&build_access_config(&cluster));
        let kube_config = match encoded {
            Ok(kube_config) => kube_config,
            Err(e) => {
                warn!(cluster = %cluster.name, error = %e, "Kubeconfig encoding failed, dropping lease");
                if let Err(release_err) = self.leases.release(lease.token).await {
                    warn!(
                        cluster = %cluster.name,
                        token = %lease.token,
                        error = %release_err,
                        "Failed to drop lease after encoding failure"
                    );
                }
                return Err(e);
            }
        };

        counter!("kc_leases_granted_total").increment(1);
        self.record_active().await;
        info!(
            cluster = %cluster.name,
            token = %lease.token,
            expires_at = %lease.expires_at,
            "Lease granted"
        );

        Ok(LeaseGrant {
            token: lease.token,
            cluster_name: cluster.name,
            endpoint: cluster.endpoint,
            kube_config,
            expires_at: lease.expires_at,
        })
    }

    /// Releases the lease identified by `token`.
    #[instrument(skip(self))]
    pub async fn release(&self, token: Uuid) -> AllocationResult<Lease> {
        let lease = self.leases.release(token).await?;
        counter!("kc_leases_released_total").increment(1);
        self.record_active().await;
        info!(cluster = %lease.cluster_name, token = %token, "Lease released");
        Ok(lease)
    }

    /// Lists active leases, oldest first.
    pub async fn active_leases(&self) -> Vec<Lease> {
        self.leases.list_active().await
    }

    /// Lists the inventory in selection order with lease state.
    pub async fn cluster_statuses(&self) -> Vec<ClusterStatus> {
        let inventory = self.inventory.snapshot().await;
        let leases = self.leases.lease_map().await;

        inventory
            .names_in_stable_order()
            .into_iter()
            .filter_map(|name| inventory.by_name(name))
            .map(|cluster| ClusterStatus {
                name: cluster.name.clone(),
                endpoint: cluster.endpoint.clone(),
                leased: leases.has_active_lease(&cluster.name),
            })
            .collect()
    }

    /// Drops expired leases, returning how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let purged = self.leases.purge_expired().await;
        if purged > 0 {
            counter!("kc_leases_expired_total").increment(purged as u64);
            self.record_active().await;
        }
        purged
    }

    /// Spawns a task that sweeps expired leases every `interval`.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep_expired().await;
            }
        })
    }

    /// Accepts `1..=max` seconds, where `max` is the configured limit
    /// capped at [`MAX_LEASE_SECS`].
    fn validate_duration(&self, duration_secs: u64) -> AllocationResult<chrono::Duration> {
        let max = self.config.max_lease_duration.as_secs().min(MAX_LEASE_SECS);
        let invalid = || AllocationError::InvalidDuration {
            requested: duration_secs,
            max,
        };
        if duration_secs == 0 || duration_secs > max {
            return Err(invalid());
        }
        i64::try_from(duration_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(invalid)
    }

    async fn record_active(&self) {
        gauge!("kc_active_leases").set(self.leases.lease_map().await.len() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Cluster, ClusterAuth};
    use crate::inventory::ClusterMap;
    use crate::kubeconfig::decode_access_config;
    use crate::lease::InMemoryLeaseStore;

    fn allocator(names: &[&str]) -> (Allocator, Arc<InMemoryLeaseStore>) {
        let map: ClusterMap = names
            .iter()
            .map(|n| {
                Cluster::new(
                    *n,
                    format!("https://{}.example", n.to_lowercase()),
                    ClusterAuth {
                        client_certificate: format!("{}-cert", n),
                        ..Default::default()
                    },
                )
            })
            .collect();
        let store = Arc::new(InMemoryLeaseStore::new());
        let allocator = Allocator::new(
            Arc::new(InventoryCache::new(map)),
            store.clone(),
            AllocatorConfig {
                max_lease_duration: Duration::from_secs(600),
            },
        );
        (allocator, store)
    }

    #[tokio::test]
    async fn test_allocate_returns_decodable_kubeconfig() {
        let (allocator, _) = allocator(&["CI-1", "CI-2"]);

        let grant = allocator.allocate(300).await.unwrap();
        assert_eq!(grant.cluster_name, "CI-1");
        assert_eq!(grant.endpoint, "https://ci-1.example");

        let config = decode_access_config(&grant.kube_config).unwrap();
        assert_eq!(config.current_context, "ci-1");
        assert_eq!(
            config.current_auth_info().unwrap().client_certificate_data,
            "CI-1-cert"
        );
    }

    #[tokio::test]
    async fn test_allocate_until_exhausted_then_release() {
        let (allocator, _) = allocator(&["A", "B"]);

        let first = allocator.allocate(60).await.unwrap();
        let second = allocator.allocate(60).await.unwrap();
        assert_eq!(first.cluster_name, "A");
        assert_eq!(second.cluster_name, "B");
        assert_eq!(
            allocator.allocate(60).await.unwrap_err(),
            AllocationError::Exhausted
        );

        allocator.release(first.token).await.unwrap();
        let again = allocator.allocate(60).await.unwrap();
        assert_eq!(again.cluster_name, "A");
    }

    #[tokio::test]
    async fn test_duration_bounds() {
        let (allocator, store) = allocator(&["A"]);

        assert!(matches!(
            allocator.allocate(0).await,
            Err(AllocationError::InvalidDuration { requested: 0, max: 600 })
        ));
        assert!(matches!(
            allocator.allocate(601).await,
            Err(AllocationError::InvalidDuration { .. })
        ));
        assert!(store.list_active().await.is_empty());

        let grant = allocator.allocate(600).await.unwrap();
        let lease = store.get(grant.token).await.unwrap();
        assert_eq!((lease.expires_at - lease.created_at).num_seconds(), 600);
    }

    #[tokio::test]
    async fn test_oversized_limit_is_capped() {
        let map: ClusterMap = ["A"]
            .into_iter()
            .map(|n| Cluster::new(n, "https://a.example", ClusterAuth::default()))
            .collect();
        let store = Arc::new(InMemoryLeaseStore::new());
        let allocator = Allocator::new(
            Arc::new(InventoryCache::new(map)),
            store.clone(),
            AllocatorConfig {
                max_lease_duration: Duration::from_secs(u64::MAX),
            },
        );

        for requested in [10_000_000_000_000, u64::MAX] {
            assert_eq!(
                allocator.allocate(requested).await.unwrap_err(),
                AllocationError::InvalidDuration {
                    requested,
                    max: MAX_LEASE_SECS,
                }
            );
        }
        assert!(store.list_active().await.is_empty());

        let grant = allocator.allocate(MAX_LEASE_SECS).await.unwrap();
        assert!(grant.expires_at > Utc::now());
        assert_eq!(
            allocator.allocate(60).await.unwrap_err(),
            AllocationError::Exhausted
        );
    }

    #[tokio::test]
    async fn test_release_unknown_token() {
        let (allocator, _) = allocator(&["A"]);
        let token = Uuid::new_v4();
        assert_eq!(
            allocator.release(token).await.unwrap_err(),
            AllocationError::LeaseNotFound(token)
        );
    }

    #[tokio::test]
    async fn test_cluster_statuses_follow_inventory_order() {
        let (allocator, _) = allocator(&["b", "a", "c"]);
        allocator.allocate(60).await.unwrap();

        let statuses = allocator.cluster_statuses().await;
        let view: Vec<(&str, bool)> = statuses
            .iter()
            .map(|s| (s.name.as_str(), s.leased))
            .collect();
        assert_eq!(view, vec![("a", true), ("b", false), ("c", false)]);
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let (allocator, store) = allocator(&["A"]);
        store
            .insert(Lease::starting_at(
                "A",
                Utc::now() - chrono::Duration::seconds(30),
                chrono::Duration::seconds(10),
            ))
            .await;

        assert_eq!(allocator.sweep_expired().await, 1);
        assert_eq!(allocator.sweep_expired().await, 0);
        assert!(allocator.active_leases().await.is_empty());
    }
}
