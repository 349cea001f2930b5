//! Application state shared across handlers.

use kc_connectors::ClusterSource;
use kc_core::{Allocator, SecureString};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::warn;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Lease allocator.
    pub allocator: Arc<Allocator>,
    /// Token clients must present as `Authorization: Bearer <token>`.
    pub auth_token: Option<Arc<SecureString>>,
    /// Inventory source, reported by the detailed health check.
    pub source: Option<Arc<dyn ClusterSource>>,
    /// Prometheus metrics handle for rendering metrics.
    pub prometheus_handle: Option<Arc<PrometheusHandle>>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(allocator: Arc<Allocator>) -> Self {
        Self {
            allocator,
            auth_token: None,
            source: None,
            prometheus_handle: None,
        }
    }

    /// Requires clients to authenticate with `token`.
    ///
    /// An empty token leaves the API unauthenticated.
    pub fn with_auth_token(mut self, token: SecureString) -> Self {
        if token.is_empty() {
            warn!("Empty auth token configured, lease API is unauthenticated");
            self.auth_token = None;
        } else {
            self.auth_token = Some(Arc::new(token));
        }
        self
    }

    /// Attaches the inventory source for health reporting.
    pub fn with_source(mut self, source: Arc<dyn ClusterSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Creates a new application state with Prometheus handle.
    pub fn with_prometheus_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(Arc::new(handle));
        self
    }
}
