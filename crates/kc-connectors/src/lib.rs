//! # kc-connectors
//!
//! Cluster inventory sources for Cluster Claimer.
//!
//! A [`ClusterSource`] produces the pool of leasable clusters, either from
//! the GKE API or from static configuration. The [`InventoryRefresher`]
//! copies a source's clusters into the shared inventory cache.

pub mod gcp;
pub mod http;
pub mod mock;
pub mod refresh;
pub mod static_source;
pub mod testing;
pub mod traits;

pub use gcp::{GkeConfig, GkeConnector};
pub use mock::MockClusterSource;
pub use refresh::InventoryRefresher;
pub use static_source::StaticClusterSource;
pub use traits::{
    AuthConfig, ClusterSource, Connector, ConnectorConfig, ConnectorError, ConnectorHealth,
    ConnectorResult,
};

pub use kc_core::SecureString;
