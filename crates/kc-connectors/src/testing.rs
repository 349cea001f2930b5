//! Test helpers for connector implementations.

use crate::traits::{AuthConfig, ConnectorConfig};
use kc_core::{Cluster, ClusterAuth, SecureString};

/// Creates a test connector config with sensible defaults.
pub fn test_connector_config(name: &str, base_url: &str) -> ConnectorConfig {
    ConnectorConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        auth: AuthConfig::None,
        timeout_secs: 30,
        max_retries: 0,
    }
}

/// Creates a cluster with credentials derived from its name.
pub fn sample_cluster(name: &str) -> Cluster {
    Cluster::new(
        name,
        format!("https://{}.test", name.to_lowercase()),
        ClusterAuth {
            cluster_ca_certificate: format!("{}-ca", name),
            client_certificate: format!("{}-cert", name),
            client_key: SecureString::new(format!("{}-key", name)),
            username: String::new(),
            password: SecureString::default(),
        },
    )
}
