//! Data transfer objects for the API.

use chrono::{DateTime, Utc};
use kc_core::{ClusterStatus, Lease, LeaseGrant};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Request to lease a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateLeaseRequest {
    /// Lease duration in seconds.
    pub max_time_secs: u64,
}

/// A granted lease with the credentials for its cluster.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaseResponse {
    /// Token used to release the lease.
    pub token: Uuid,
    /// Name of the leased cluster.
    pub cluster_name: String,
    /// API server address of the leased cluster.
    pub ip: String,
    /// Base64-encoded kubeconfig JSON.
    pub kube_config: String,
    /// When the lease expires.
    pub expires_at: DateTime<Utc>,
}

impl From<LeaseGrant> for LeaseResponse {
    fn from(grant: LeaseGrant) -> Self {
        Self {
            token: grant.token,
            cluster_name: grant.cluster_name,
            ip: grant.endpoint,
            kube_config: grant.kube_config,
            expires_at: grant.expires_at,
        }
    }
}

/// An active lease, without credentials.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaseSummary {
    pub token: Uuid,
    pub cluster_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Lease> for LeaseSummary {
    fn from(lease: Lease) -> Self {
        Self {
            token: lease.token,
            cluster_name: lease.cluster_name,
            created_at: lease.created_at,
            expires_at: lease.expires_at,
        }
    }
}

/// A pool member and whether it is leased.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClusterResponse {
    pub name: String,
    pub endpoint: String,
    pub leased: bool,
}

impl From<ClusterStatus> for ClusterResponse {
    fn from(status: ClusterStatus) -> Self {
        Self {
            name: status.name,
            endpoint: status.endpoint,
            leased: status.leased,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status ("healthy", "degraded", "unhealthy").
    pub status: String,
    /// Service version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
    /// Inventory state.
    pub inventory: InventoryHealth,
    /// Number of active leases.
    pub active_leases: usize,
    /// Inventory source health, when a source is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceHealth>,
}

/// Inventory part of the health response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InventoryHealth {
    /// Number of clusters in the pool.
    pub clusters: usize,
    /// When the inventory was last refreshed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Inventory source part of the health response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SourceHealth {
    pub name: String,
    pub source_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
