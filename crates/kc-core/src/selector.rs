//! Cluster selection.

use crate::cluster::Cluster;
use crate::error::{AllocationError, AllocationResult};
use crate::inventory::ClusterInventory;
use crate::lease::LeaseIndex;
use tracing::{debug, warn};

/// Returns the first cluster, in inventory order, that has no active lease.
///
/// Selection is a read-only scan: no lease is created or reserved. There is
/// no fairness or load balancing; the same inventory and lease set always
/// yield the same cluster.
///
/// Fails with [`AllocationError::Exhausted`] when every cluster is leased.
pub fn select_unleased<I, L>(inventory: &I, leases: &L) -> AllocationResult<Cluster>
where
    I: ClusterInventory + ?Sized,
    L: LeaseIndex + ?Sized,
{
    for name in inventory.names_in_stable_order() {
        let Some(cluster) = inventory.by_name(name) else {
            warn!(cluster = %name, "Inventory listed a cluster it cannot resolve");
            continue;
        };
        if !leases.has_active_lease(name) {
            debug!(cluster = %name, "Selected unleased cluster");
            return Ok(cluster.clone());
        }
    }
    Err(AllocationError::Exhausted)
}
