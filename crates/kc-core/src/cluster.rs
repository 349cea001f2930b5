//! Cluster records as seen by the claimer.

use crate::secure_string::SecureString;
use serde::{Deserialize, Serialize};

/// A managed Kubernetes cluster available for leasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Unique, stable name within the pool.
    pub name: String,
    /// Address of the cluster's API server.
    pub endpoint: String,
    /// Credentials for the API server.
    #[serde(default)]
    pub auth: ClusterAuth,
}

/// Authentication material for a cluster's API server.
///
/// Empty strings mean "not set"; they are carried through to the
/// kubeconfig unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAuth {
    /// Certificate authority data for the API server.
    #[serde(default)]
    pub cluster_ca_certificate: String,
    /// Client certificate data.
    #[serde(default)]
    pub client_certificate: String,
    /// Client key data.
    #[serde(default)]
    pub client_key: SecureString,
    /// Basic-auth username.
    #[serde(default)]
    pub username: String,
    /// Basic-auth password.
    #[serde(default)]
    pub password: SecureString,
}

impl Cluster {
    /// Creates a cluster record.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, auth: ClusterAuth) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_missing_auth_fields() {
        let json = r#"{
            "name": "ci-1",
            "endpoint": "https://10.0.0.1",
            "auth": { "client_certificate": "CERT" }
        }"#;

        let cluster: Cluster = serde_json::from_str(json).unwrap();
        assert_eq!(cluster.name, "ci-1");
        assert_eq!(cluster.auth.client_certificate, "CERT");
        assert!(cluster.auth.client_key.is_empty());
        assert!(cluster.auth.username.is_empty());
    }

    #[test]
    fn test_debug_hides_client_key() {
        let cluster = Cluster::new(
            "ci-1",
            "https://10.0.0.1",
            ClusterAuth {
                client_key: SecureString::from("PRIVATE"),
                ..Default::default()
            },
        );
        assert!(!format!("{:?}", cluster).contains("PRIVATE"));
    }
}
