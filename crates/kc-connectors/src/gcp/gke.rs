//! Google Kubernetes Engine (GKE) connector.
//!
//! Lists the clusters of a GCP project through the GKE REST API and turns
//! their master auth into claimer cluster records.

use crate::http::HttpClient;
use crate::traits::{ClusterSource, Connector, ConnectorError, ConnectorHealth, ConnectorResult};
use async_trait::async_trait;
use kc_core::{Cluster, ClusterAuth, SecureString};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// GKE connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GkeConfig {
    /// Base connector configuration.
    #[serde(flatten)]
    pub connector: crate::traits::ConnectorConfig,
    /// GCP project ID.
    pub project_id: String,
    /// Zone or region to list; `-` lists all locations.
    #[serde(default = "default_location")]
    pub location: String,
}

fn default_location() -> String {
    "-".to_string()
}

/// Google Kubernetes Engine connector.
pub struct GkeConnector {
    config: GkeConfig,
    client: HttpClient,
}

impl GkeConnector {
    /// Creates a new GKE connector.
    pub fn new(config: GkeConfig) -> ConnectorResult<Self> {
        if config.project_id.is_empty() {
            return Err(ConnectorError::ConfigError(
                "GKE project_id must not be empty".to_string(),
            ));
        }
        let client = HttpClient::new(config.connector.clone())?;
        info!(
            "GKE connector initialized for project '{}' (location '{}')",
            config.project_id, config.location
        );
        Ok(Self { config, client })
    }

    /// Builds the cluster list path.
    fn clusters_path(&self) -> String {
        format!(
            "/v1/projects/{}/locations/{}/clusters",
            self.config.project_id, self.config.location
        )
    }

    /// Converts a GKE cluster into a claimer cluster record.
    ///
    /// GKE reports the endpoint as a bare IP, so `https://` is prepended
    /// when no scheme is present.
    fn parse_cluster(cluster: GkeCluster) -> Cluster {
        let endpoint = if cluster.endpoint.contains("://") {
            cluster.endpoint
        } else {
            format!("https://{}", cluster.endpoint)
        };
        let auth = cluster.master_auth.unwrap_or_default();

        Cluster::new(
            cluster.name,
            endpoint,
            ClusterAuth {
                cluster_ca_certificate: auth.cluster_ca_certificate,
                client_certificate: auth.client_certificate,
                client_key: SecureString::new(auth.client_key),
                username: auth.username,
                password: SecureString::new(auth.password),
            },
        )
    }
}

#[async_trait]
impl Connector for GkeConnector {
    fn name(&self) -> &str {
        &self.config.connector.name
    }

    fn connector_type(&self) -> &str {
        "gke"
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        match self.client.get(&self.clusters_path()).await {
            Ok(response) if response.status().is_success() => Ok(ConnectorHealth::Healthy),
            Ok(response) => Ok(ConnectorHealth::Degraded(format!(
                "Unexpected response: {}",
                response.status()
            ))),
            Err(ConnectorError::AuthenticationFailed(_)) => Ok(ConnectorHealth::Unhealthy(
                "Authentication failed".to_string(),
            )),
            Err(ConnectorError::AuthorizationDenied(_)) => Ok(ConnectorHealth::Unhealthy(
                "Authorization denied".to_string(),
            )),
            Err(e) => Ok(ConnectorHealth::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl ClusterSource for GkeConnector {
    #[instrument(skip(self), fields(project = %self.config.project_id))]
    async fn fetch_clusters(&self) -> ConnectorResult<Vec<Cluster>> {
        let response: GkeListClustersResponse = self.client.get_json(&self.clusters_path()).await?;

        if !response.missing_zones.is_empty() {
            info!(zones = ?response.missing_zones, "GKE reported unreachable zones");
        }

        Ok(response
            .clusters
            .into_iter()
            .map(Self::parse_cluster)
            .collect())
    }
}

// GKE API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GkeListClustersResponse {
    #[serde(default)]
    clusters: Vec<GkeCluster>,
    #[serde(default)]
    missing_zones: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GkeCluster {
    name: String,
    #[serde(default)]
    endpoint: String,
    master_auth: Option<GkeMasterAuth>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GkeMasterAuth {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    cluster_ca_certificate: String,
    #[serde(default)]
    client_certificate: String,
    #[serde(default)]
    client_key: String,
}
