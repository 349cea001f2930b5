//! Lease bookkeeping.
//!
//! A lease is a time-bounded exclusive claim on one cluster. The
//! [`LeaseStore`] is the only place leases are created, and it creates them
//! with [`LeaseStore::claim_first_unleased`], which selects and records the
//! lease under one write lock. Two concurrent allocations therefore can
//! never be handed the same cluster.

use crate::cluster::Cluster;
use crate::error::{AllocationError, AllocationResult};
use crate::inventory::ClusterInventory;
use crate::selector::select_unleased;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Longest lease any store will record: ten years.
pub const MAX_LEASE_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// An exclusive, expiring claim on a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Opaque token the holder uses to release the lease.
    pub token: Uuid,
    /// Name of the leased cluster.
    pub cluster_name: String,
    /// When the lease was granted.
    pub created_at: DateTime<Utc>,
    /// When the lease stops counting as active.
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    /// Creates a lease starting now.
    pub fn new(cluster_name: impl Into<String>, duration: Duration) -> Self {
        Self::starting_at(cluster_name, Utc::now(), duration)
    }

    /// Creates a lease starting at `created_at`.
    ///
    /// The expiry saturates at the latest representable instant.
    pub fn starting_at(
        cluster_name: impl Into<String>,
        created_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            token: Uuid::new_v4(),
            cluster_name: cluster_name.into(),
            created_at,
            expires_at: created_at
                .checked_add_signed(duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Creates a lease starting at `created_at`, or `None` if `duration` is
    /// not positive or the expiry is not representable.
    pub fn try_starting_at(
        cluster_name: impl Into<String>,
        created_at: DateTime<Utc>,
        duration: Duration,
    ) -> Option<Self> {
        if duration <= Duration::zero() {
            return None;
        }
        let expires_at = created_at.checked_add_signed(duration)?;
        Some(Self {
            token: Uuid::new_v4(),
            cluster_name: cluster_name.into(),
            created_at,
            expires_at,
        })
    }

    /// Returns true if the lease has not yet expired at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Membership test for active leases.
pub trait LeaseIndex {
    /// Returns true if the named cluster is currently leased.
    fn has_active_lease(&self, cluster_name: &str) -> bool;
}

impl LeaseIndex for HashSet<String> {
    fn has_active_lease(&self, cluster_name: &str) -> bool {
        self.contains(cluster_name)
    }
}

/// Active leases keyed by cluster name, as of a fixed instant.
#[derive(Debug, Clone, Default)]
pub struct LeaseMap {
    by_cluster: HashMap<String, Lease>,
}

impl LeaseMap {
    /// Builds the index from `leases`, keeping only those active at `now`.
    pub fn active_at<'a>(leases: impl IntoIterator<Item = &'a Lease>, now: DateTime<Utc>) -> Self {
        let by_cluster = leases
            .into_iter()
            .filter(|lease| lease.is_active_at(now))
            .map(|lease| (lease.cluster_name.clone(), lease.clone()))
            .collect();
        Self { by_cluster }
    }

    /// Returns the active lease on a cluster, if any.
    pub fn lease_by_cluster_name(&self, cluster_name: &str) -> Option<&Lease> {
        self.by_cluster.get(cluster_name)
    }

    /// Number of leased clusters.
    pub fn len(&self) -> usize {
        self.by_cluster.len()
    }

    /// Returns true if no cluster is leased.
    pub fn is_empty(&self) -> bool {
        self.by_cluster.is_empty()
    }
}

impl LeaseIndex for LeaseMap {
    fn has_active_lease(&self, cluster_name: &str) -> bool {
        self.by_cluster.contains_key(cluster_name)
    }
}

/// Storage for leases.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Atomically selects the first unleased cluster in `inventory` and
    /// records a lease on it.
    ///
    /// A duration that is not positive, or whose expiry cannot be
    /// represented, fails with [`AllocationError::InvalidDuration`] and
    /// records nothing.
    async fn claim_first_unleased(
        &self,
        inventory: &dyn ClusterInventory,
        duration: Duration,
    ) -> AllocationResult<(Cluster, Lease)>;

    /// Removes a lease by token, returning it.
    async fn release(&self, token: Uuid) -> AllocationResult<Lease>;

    /// Returns an active lease by token.
    async fn get(&self, token: Uuid) -> Option<Lease>;

    /// Returns all active leases, oldest first.
    async fn list_active(&self) -> Vec<Lease>;

    /// Returns the index of active leases as of now.
    async fn lease_map(&self) -> LeaseMap;

    /// Drops expired leases, returning how many were removed.
    async fn purge_expired(&self) -> usize;
}

/// Lease store kept in process memory.
#[derive(Default)]
pub struct InMemoryLeaseStore {
    leases: RwLock<HashMap<Uuid, Lease>>,
}

impl InMemoryLeaseStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a lease directly, bypassing selection.
    pub async fn insert(&self, lease: Lease) {
        self.leases.write().await.insert(lease.token, lease);
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn claim_first_unleased(
        &self,
        inventory: &dyn ClusterInventory,
        duration: Duration,
    ) -> AllocationResult<(Cluster, Lease)> {
        let mut leases = self.leases.write().await;
        let now = Utc::now();

        let index = LeaseMap::active_at(leases.values(), now);
        let cluster = select_unleased(inventory, &index)?;

        let lease = Lease::try_starting_at(&cluster.name, now, duration).ok_or(
            AllocationError::InvalidDuration {
                requested: u64::try_from(duration.num_seconds()).unwrap_or(0),
                max: MAX_LEASE_SECS,
            },
        )?;
        leases.insert(lease.token, lease.clone());
        debug!(cluster = %cluster.name, token = %lease.token, "Lease recorded");

        Ok((cluster, lease))
    }

    async fn release(&self, token: Uuid) -> AllocationResult<Lease> {
        let now = Utc::now();
        let mut leases = self.leases.write().await;
        match leases.remove(&token) {
            Some(lease) if lease.is_active_at(now) => Ok(lease),
            _ => Err(AllocationError::LeaseNotFound(token)),
        }
    }

    async fn get(&self, token: Uuid) -> Option<Lease> {
        let now = Utc::now();
        self.leases
            .read()
            .await
            .get(&token)
            .filter(|lease| lease.is_active_at(now))
            .cloned()
    }

    async fn list_active(&self) -> Vec<Lease> {
        let now = Utc::now();
        let mut active: Vec<Lease> = self
            .leases
            .read()
            .await
            .values()
            .filter(|lease| lease.is_active_at(now))
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        active
    }

    async fn lease_map(&self) -> LeaseMap {
        LeaseMap::active_at(self.leases.read().await.values(), Utc::now())
    }

    async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut leases = self.leases.write().await;
        let before = leases.len();
        leases.retain(|_, lease| lease.is_active_at(now));
        let purged = before - leases.len();
        if purged > 0 {
            info!(purged, remaining = leases.len(), "Purged expired leases");
        }
        purged
    }
}
