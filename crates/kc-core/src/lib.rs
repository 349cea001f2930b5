//! # kc-core
//!
//! Core allocation logic for Cluster Claimer.
//!
//! This crate picks an unleased cluster from the pool, tracks leases, and
//! turns the chosen cluster's credentials into a portable kubeconfig string.
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌────────────────┐   ┌──────────┐
//! │ Inventory │──▶│   Selector   │──▶│  Materializer  │──▶│  base64  │
//! └───────────┘   └──────────────┘   └────────────────┘   └──────────┘
//!                        ▲
//!                 ┌──────┴──────┐
//!                 │ Lease index │
//!                 └─────────────┘
//! ```

pub mod allocator;
pub mod cluster;
pub mod error;
pub mod inventory;
pub mod kubeconfig;
pub mod lease;
pub mod secure_string;
pub mod selector;

pub use allocator::{Allocator, AllocatorConfig, ClusterStatus, LeaseGrant};
pub use cluster::{Cluster, ClusterAuth};
pub use error::{AllocationError, AllocationResult};
pub use inventory::{ClusterInventory, ClusterMap, InventoryCache};
pub use kubeconfig::{
    build_access_config, decode_access_config, encode_access_config, AccessConfig,
    AuthInfoEntry, ClusterEntry, ContextEntry, DecodeError, KUBECONFIG_API_VERSION,
};
pub use lease::{InMemoryLeaseStore, Lease, LeaseIndex, LeaseMap, LeaseStore, MAX_LEASE_SECS};
pub use secure_string::SecureString;
pub use selector::select_unleased;
