//! Startup validation for Cluster Claimer configuration.
//!
//! Catches settings that would leave the server unable to hand out clusters
//! before it starts listening.

use crate::config::{AppConfig, SourceKind, GKE_ACCESS_TOKEN_ENV};
use colored::Colorize;
use kc_core::MAX_LEASE_SECS;
use kc_observability::LoggingConfig;
use std::collections::HashSet;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Critical errors that prevent startup.
    pub errors: Vec<String>,
    /// Warnings that should be addressed but don't prevent startup.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a new empty validation result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Validates application configuration before startup.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the application configuration.
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_server(config, &mut result);
        Self::validate_auth(config, &mut result);
        Self::validate_leases(config, &mut result);
        Self::validate_logging(config, &mut result);

        match config.inventory.source {
            SourceKind::Static => Self::validate_static_inventory(config, &mut result),
            SourceKind::Gke => Self::validate_gke_inventory(config, &mut result),
        }

        if config.inventory.refresh_interval_secs == 0 {
            result.add_error("inventory.refresh_interval_secs must be greater than 0");
        }

        result
    }

    fn validate_server(config: &AppConfig, result: &mut ValidationResult) {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        if addr.parse::<std::net::SocketAddr>().is_err() {
            result.add_error(format!("Invalid bind address: {}", addr));
        }
        if config.server.request_timeout_secs == 0 {
            result.add_error("server.request_timeout_secs must be greater than 0");
        }
    }

    fn validate_auth(config: &AppConfig, result: &mut ValidationResult) {
        if config.auth_token.is_empty() {
            result.add_warning(
                "No auth_token configured. Anyone who can reach the server can lease clusters \
                 and receive their credentials. Set auth_token or KC_AUTH_TOKEN.",
            );
        } else if config.auth_token.len() < 16 {
            result.add_warning("auth_token is shorter than 16 characters");
        }
    }

    fn validate_leases(config: &AppConfig, result: &mut ValidationResult) {
        if config.leases.max_duration_secs == 0 {
            result.add_error("leases.max_duration_secs must be greater than 0");
        } else if config.leases.max_duration_secs > MAX_LEASE_SECS {
            result.add_error(format!(
                "leases.max_duration_secs must be at most {} (ten years), got {}",
                MAX_LEASE_SECS, config.leases.max_duration_secs
            ));
        }
        if config.leases.sweep_interval_secs == 0 {
            result.add_error("leases.sweep_interval_secs must be greater than 0");
        }
    }

    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        if LoggingConfig::from_level_name(&config.logging.level, false).is_err() {
            result.add_error(format!(
                "Invalid logging.level '{}'. Valid levels: trace, debug, info, warn, error",
                config.logging.level
            ));
        }
    }

    fn validate_static_inventory(config: &AppConfig, result: &mut ValidationResult) {
        let clusters = &config.inventory.clusters;
        if clusters.is_empty() {
            result.add_warning(
                "Static inventory has no clusters. Every lease request will fail with NO_CAPACITY.",
            );
            return;
        }

        let mut seen = HashSet::new();
        for cluster in clusters {
            if cluster.name.is_empty() {
                result.add_error("Cluster with empty name in inventory.clusters");
                continue;
            }
            if !seen.insert(cluster.name.as_str()) {
                result.add_error(format!("Duplicate cluster name: {}", cluster.name));
            }
            if cluster.endpoint.is_empty() {
                result.add_error(format!("Cluster '{}' has no endpoint", cluster.name));
            }
            if cluster.auth.cluster_ca_certificate.is_empty() {
                result.add_warning(format!(
                    "Cluster '{}' has no CA certificate; clients cannot verify its API server",
                    cluster.name
                ));
            }
        }
    }

    fn validate_gke_inventory(config: &AppConfig, result: &mut ValidationResult) {
        let gke = &config.inventory.gke;
        if gke.project.is_empty() {
            result.add_error("inventory.gke.project is required when inventory.source is gke");
        }
        if gke.access_token.is_empty() {
            result.add_error(format!(
                "Missing GKE access token. Set inventory.gke.access_token or {}",
                GKE_ACCESS_TOKEN_ENV
            ));
        }
        if !gke.base_url.starts_with("http://") && !gke.base_url.starts_with("https://") {
            result.add_error(format!(
                "inventory.gke.base_url must be an http(s) URL, got '{}'",
                gke.base_url
            ));
        }
        if !config.inventory.clusters.is_empty() {
            result.add_warning("inventory.clusters is ignored when inventory.source is gke");
        }
    }
}
