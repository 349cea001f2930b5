//! Serve command - starts the API server.

use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use kc_api::{ApiServer, ApiServerConfig, AppState};
use kc_connectors::{
    AuthConfig, ClusterSource, ConnectorConfig, GkeConfig, GkeConnector, InventoryRefresher,
    StaticClusterSource,
};
use kc_core::{Allocator, AllocatorConfig, InMemoryLeaseStore, InventoryCache, SecureString};

use crate::config::{AppConfig, InventoryConfig, SourceKind};

/// Server configuration from CLI arguments.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Port to listen on.
    pub port: u16,
    /// Hostname to bind to.
    pub host: String,
    /// Enable Swagger UI.
    pub enable_swagger: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl ServeConfig {
    /// Takes server settings from the config file, with CLI flags on top.
    pub fn from_app_config(
        app_config: &AppConfig,
        port: Option<u16>,
        host: Option<String>,
        no_swagger: bool,
    ) -> Self {
        Self {
            port: port.unwrap_or(app_config.server.port),
            host: host.unwrap_or_else(|| app_config.server.host.clone()),
            enable_swagger: app_config.server.enable_swagger && !no_swagger,
            timeout_secs: app_config.server.request_timeout_secs,
        }
    }
}

/// Builds the cluster source named by the inventory config.
pub fn build_source(inventory: &InventoryConfig) -> Result<Arc<dyn ClusterSource>> {
    match inventory.source {
        SourceKind::Static => Ok(Arc::new(StaticClusterSource::new(
            "static",
            inventory.clusters.clone(),
        ))),
        SourceKind::Gke => {
            let gke = &inventory.gke;
            let connector = GkeConnector::new(GkeConfig {
                connector: ConnectorConfig {
                    name: "gke".to_string(),
                    base_url: gke.base_url.clone(),
                    auth: AuthConfig::BearerToken {
                        token: SecureString::from(gke.access_token.clone()),
                    },
                    timeout_secs: gke.timeout_secs,
                    max_retries: 3,
                },
                project_id: gke.project.clone(),
                location: gke.location.clone(),
            })
            .context("Failed to create GKE connector")?;
            Ok(Arc::new(connector))
        }
    }
}

/// Runs the API server.
pub async fn run_server(config: ServeConfig, app_config: AppConfig) -> Result<()> {
    println!("{} Starting Cluster Claimer...", "[server]".cyan());

    let prometheus_handle = match kc_observability::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Metrics disabled");
            None
        }
    };

    // Inventory
    let source = build_source(&app_config.inventory)?;
    println!(
        "  {} Inventory source: {}",
        "→".green(),
        app_config.inventory.source
    );

    let cache = Arc::new(InventoryCache::empty());
    let refresher = Arc::new(InventoryRefresher::new(source.clone(), cache.clone()));
    match refresher.refresh_once().await {
        Ok(count) => println!("  {} Loaded {} clusters", "✓".green(), count),
        Err(e) => println!(
            "  {} Initial inventory load failed: {} (will retry)",
            "⚠".yellow(),
            e
        ),
    }
    let refresh_task = refresher.spawn(Duration::from_secs(
        app_config.inventory.refresh_interval_secs,
    ));

    // Leases
    let allocator = Arc::new(Allocator::new(
        cache,
        Arc::new(InMemoryLeaseStore::new()),
        AllocatorConfig {
            max_lease_duration: Duration::from_secs(app_config.leases.max_duration_secs),
        },
    ));
    let sweep_task = allocator
        .clone()
        .spawn_sweeper(Duration::from_secs(app_config.leases.sweep_interval_secs));

    let mut state = AppState::new(allocator)
        .with_auth_token(SecureString::from(app_config.auth_token.clone()))
        .with_source(source);
    if let Some(handle) = prometheus_handle {
        state = state.with_prometheus_handle(handle);
    }

    let bind_address: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    let server_config = ApiServerConfig {
        bind_address,
        request_timeout: Duration::from_secs(config.timeout_secs),
        enable_swagger: config.enable_swagger,
    };

    println!();
    println!("{}", "Cluster Claimer API Server".bold());
    println!("{}", "═".repeat(40));
    println!("  {} http://{}", "Address:".cyan(), bind_address);
    println!(
        "  {} {}s",
        "Max lease:".cyan(),
        app_config.leases.max_duration_secs
    );
    if app_config.auth_token.is_empty() {
        println!("  {} {}", "Auth:".cyan(), "disabled".red());
    } else {
        println!("  {} bearer token", "Auth:".cyan());
    }

    if config.enable_swagger {
        println!(
            "  {} http://{}/swagger-ui",
            "Swagger UI:".cyan(),
            bind_address
        );
    }

    println!();
    println!("{}", "Endpoints:".bold());
    println!("  POST   /api/v1/leases         - Lease a cluster");
    println!("  GET    /api/v1/leases         - List active leases");
    println!("  DELETE /api/v1/leases/:token  - Release a lease");
    println!("  GET    /api/v1/clusters       - List the cluster pool");
    println!("  GET    /health                - Health check");
    println!("  GET    /ready                 - Readiness check");
    println!("  GET    /live                  - Liveness check");
    println!("  GET    /metrics               - Prometheus metrics");
    println!();
    println!("Press {} to stop", "Ctrl+C".yellow());
    println!();

    let server = ApiServer::new(state, server_config);
    let result = server.run().await.context("Server error");

    refresh_task.abort();
    sweep_task.abort();

    result?;

    println!();
    println!("{} Server stopped", "[server]".cyan());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_core::{Cluster, ClusterAuth};

    #[tokio::test]
    async fn test_build_static_source() {
        let mut inventory = InventoryConfig::default();
        inventory.clusters = vec![
            Cluster::new("b", "https://b", ClusterAuth::default()),
            Cluster::new("a", "https://a", ClusterAuth::default()),
        ];

        let source = build_source(&inventory).unwrap();
        assert_eq!(source.connector_type(), "static");
        assert_eq!(source.fetch_clusters().await.unwrap().len(), 2);
    }

    #[test]
    fn test_build_gke_source_requires_project() {
        let mut inventory = InventoryConfig::default();
        inventory.source = SourceKind::Gke;
        assert!(build_source(&inventory).is_err());

        inventory.gke.project = "proj".to_string();
        let source = build_source(&inventory).unwrap();
        assert_eq!(source.connector_type(), "gke");
    }

    #[test]
    fn test_cli_flags_override_config() {
        let mut app_config = AppConfig::default();
        app_config.server.port = 9000;

        let from_file = ServeConfig::from_app_config(&app_config, None, None, false);
        assert_eq!(from_file.port, 9000);
        assert!(from_file.enable_swagger);

        let overridden =
            ServeConfig::from_app_config(&app_config, Some(7000), Some("127.0.0.1".into()), true);
        assert_eq!(overridden.port, 7000);
        assert_eq!(overridden.host, "127.0.0.1");
        assert!(!overridden.enable_swagger);
    }
}
