//! Configuration loading for Cluster Claimer CLI.

use anyhow::{Context, Result};
use kc_core::{Cluster, SecureString};
use serde::{Deserialize, Serialize};
use std::path::Path;

const REDACTED: &str = "***REDACTED***";

/// Environment variable overriding `auth_token`.
pub const AUTH_TOKEN_ENV: &str = "KC_AUTH_TOKEN";

/// Environment variable overriding `inventory.gke.access_token`.
pub const GKE_ACCESS_TOKEN_ENV: &str = "KC_GKE_ACCESS_TOKEN";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Bearer token clients must present. Empty disables authentication.
    #[serde(default)]
    pub auth_token: String,

    /// Lease limits and expiry.
    #[serde(default)]
    pub leases: LeaseConfig,

    /// Where the cluster pool comes from.
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies `KC_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(AUTH_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.auth_token = token;
        }
        if let Some(token) = lookup(GKE_ACCESS_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.inventory.gke.access_token = token;
        }
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();

        if !config.auth_token.is_empty() {
            config.auth_token = REDACTED.to_string();
        }
        if !config.inventory.gke.access_token.is_empty() {
            config.inventory.gke.access_token = REDACTED.to_string();
        }

        for cluster in &mut config.inventory.clusters {
            if !cluster.auth.client_key.is_empty() {
                cluster.auth.client_key = SecureString::from(REDACTED);
            }
            if !cluster.auth.password.is_empty() {
                cluster.auth.password = SecureString::from(REDACTED);
            }
        }

        config
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Serve Swagger UI at `/swagger-ui`.
    #[serde(default = "default_true")]
    pub enable_swagger: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_swagger: true,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Lease configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    /// Longest lease a client may request, in seconds.
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u64,

    /// How often expired leases are purged, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_max_duration() -> u64 {
    4 * 60 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: default_max_duration(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Kind of inventory source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Clusters listed in this file.
    #[default]
    Static,
    /// Clusters listed by the GKE API.
    Gke,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Static => write!(f, "static"),
            SourceKind::Gke => write!(f, "gke"),
        }
    }
}

/// Inventory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Which source populates the pool.
    #[serde(default)]
    pub source: SourceKind,

    /// GKE settings, used when `source` is `gke`.
    #[serde(default)]
    pub gke: GkeSettings,

    /// Clusters, used when `source` is `static`.
    #[serde(default)]
    pub clusters: Vec<Cluster>,

    /// How often the pool is re-read from the source, in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

fn default_refresh_interval() -> u64 {
    300
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            gke: GkeSettings::default(),
            clusters: Vec::new(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

/// GKE connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GkeSettings {
    /// GCP project ID.
    #[serde(default)]
    pub project: String,

    /// Zone or region; `-` lists every location.
    #[serde(default = "default_location")]
    pub location: String,

    /// GKE API base URL.
    #[serde(default = "default_gke_base_url")]
    pub base_url: String,

    /// OAuth access token for the GKE API.
    #[serde(default)]
    pub access_token: String,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_location() -> String {
    "-".to_string()
}

fn default_gke_base_url() -> String {
    "https://container.googleapis.com".to_string()
}

impl Default for GkeSettings {
    fn default() -> Self {
        Self {
            project: String::new(),
            location: default_location(),
            base_url: default_gke_base_url(),
            access_token: String::new(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to use JSON format.
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_core::ClusterAuth;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.leases.max_duration_secs, 14_400);
        assert_eq!(config.inventory.source, SourceKind::Static);
        assert_eq!(config.inventory.gke.location, "-");
        assert!(config.auth_token.is_empty());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
server:
  port: 9090
auth_token: s3cret
leases:
  max_duration_secs: 3600
inventory:
  source: static
  clusters:
    - name: Prod-East
      endpoint: https://1.2.3.4
      auth:
        cluster_ca_certificate: CAFE
        client_certificate: BEEF
        client_key: F00D
    - name: Staging
      endpoint: https://5.6.7.8
logging:
  level: debug
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth_token, "s3cret");
        assert_eq!(config.leases.max_duration_secs, 3600);
        assert_eq!(config.leases.sweep_interval_secs, 60);
        assert_eq!(config.inventory.clusters.len(), 2);
        assert_eq!(config.inventory.clusters[0].auth.client_key.expose_secret(), "F00D");
        assert_eq!(config.inventory.clusters[1].auth, ClusterAuth::default());
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_parse_gke_source() {
        let yaml = r#"
inventory:
  source: gke
  gke:
    project: my-project
    location: us-central1
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.inventory.source, SourceKind::Gke);
        assert_eq!(config.inventory.gke.project, "my-project");
        assert_eq!(config.inventory.gke.base_url, "https://container.googleapis.com");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "auth_token: from-file").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.auth_token, "from-file");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "inventory: [not, a, map]").unwrap();

        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (AUTH_TOKEN_ENV, "env-token"),
            (GKE_ACCESS_TOKEN_ENV, ""),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.inventory.gke.access_token = "file-token".to_string();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.auth_token, "env-token");
        // Empty variables do not clear configured values
        assert_eq!(config.inventory.gke.access_token, "file-token");
    }

    #[test]
    fn test_redact_secrets() {
        let mut config = AppConfig::default();
        config.auth_token = "secret".to_string();
        config.inventory.gke.access_token = "ya29.token".to_string();
        config.inventory.clusters.push(Cluster::new(
            "Prod-East",
            "https://1.2.3.4",
            ClusterAuth {
                client_certificate: "BEEF".to_string(),
                client_key: SecureString::from("F00D"),
                ..Default::default()
            },
        ));

        let redacted = config.redact_secrets();
        assert_eq!(redacted.auth_token, REDACTED);
        assert_eq!(redacted.inventory.gke.access_token, REDACTED);

        let auth = &redacted.inventory.clusters[0].auth;
        assert_eq!(auth.client_key.expose_secret(), REDACTED);
        assert_eq!(auth.client_certificate, "BEEF");
        // Unset secrets stay empty
        assert!(auth.password.is_empty());
    }
}
