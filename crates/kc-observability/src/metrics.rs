//! Metrics for Cluster Claimer.
//!
//! Counters are emitted with the `metrics` crate from wherever the event
//! happens; this module describes them and installs the Prometheus
//! recorder that `GET /metrics` renders.

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Failed to install Prometheus recorder: {0}")]
    Install(String),
}

/// Installs the global Prometheus recorder and describes all metrics.
///
/// Only the first call in a process can succeed.
pub fn init_metrics() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;
    register_metrics();
    Ok(handle)
}

/// Registers metric descriptions.
pub fn register_metrics() {
    describe_counter!("kc_leases_granted_total", "Total number of leases granted");
    describe_counter!(
        "kc_leases_released_total",
        "Total number of leases released by their holders"
    );
    describe_counter!(
        "kc_leases_expired_total",
        "Total number of expired leases purged by the sweeper"
    );
    describe_counter!(
        "kc_allocation_exhausted_total",
        "Number of allocation requests refused because every cluster was leased"
    );
    describe_counter!(
        "kc_inventory_refreshes_total",
        "Number of successful inventory refreshes"
    );
    describe_counter!(
        "kc_inventory_refresh_failures_total",
        "Number of failed inventory refreshes"
    );
    describe_counter!(
        "kc_auth_failures_total",
        "Number of API requests rejected for missing or invalid credentials"
    );
    describe_gauge!("kc_active_leases", "Number of currently active leases");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_recorder_renders_described_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            metrics::counter!("kc_leases_granted_total").increment(2);
        });

        let rendered = handle.render();
        assert!(rendered.contains("kc_leases_granted_total 2"));
        assert!(rendered.contains("Total number of leases granted"));
    }
}
