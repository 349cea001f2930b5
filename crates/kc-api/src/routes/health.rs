//! Health check endpoints.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use kc_connectors::ConnectorHealth;
use std::time::Instant;

use crate::dto::{HealthResponse, InventoryHealth, SourceHealth};
use crate::state::AppState;

/// Start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time.
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(health_check_detailed))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint.
///
/// Reports "degraded" while the pool is empty, since no lease can succeed.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service health", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let inventory = inventory_health(&state).await;
    let status = if inventory.clusters > 0 {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime_seconds(),
        inventory,
        active_leases: state.allocator.active_leases().await.len(),
        source: None,
    })
}

/// Detailed health check endpoint.
///
/// Also checks the inventory source.
#[utoipa::path(
    get,
    path = "/health/detailed",
    responses(
        (status = 200, description = "Detailed service health", body = HealthResponse),
        (status = 503, description = "Inventory source is unhealthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check_detailed(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let inventory = inventory_health(&state).await;

    let source = match &state.source {
        Some(source) => {
            let (status, message) = match source.health_check().await {
                Ok(ConnectorHealth::Healthy) => ("healthy", None),
                Ok(ConnectorHealth::Degraded(msg)) => ("degraded", Some(msg)),
                Ok(ConnectorHealth::Unhealthy(msg)) => ("unhealthy", Some(msg)),
                Err(e) => ("unhealthy", Some(e.to_string())),
            };
            Some(SourceHealth {
                name: source.name().to_string(),
                source_type: source.connector_type().to_string(),
                status: status.to_string(),
                message,
            })
        }
        None => None,
    };

    let source_unhealthy = source.as_ref().is_some_and(|s| s.status == "unhealthy");
    let status = if source_unhealthy {
        "unhealthy"
    } else if inventory.clusters == 0 || source.as_ref().is_some_and(|s| s.status == "degraded")
    {
        "degraded"
    } else {
        "healthy"
    };
    let http_status = if source_unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: uptime_seconds(),
            inventory,
            active_leases: state.allocator.active_leases().await.len(),
            source,
        }),
    )
}

/// Readiness check.
///
/// Ready once the inventory has been loaded at least once.
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Ready to serve leases"),
        (status = 503, description = "Inventory not loaded yet")
    ),
    tag = "Health"
)]
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.allocator.inventory().refreshed_at().await.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/live",
    responses((status = 200, description = "Process is alive")),
    tag = "Health"
)]
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

async fn inventory_health(state: &AppState) -> InventoryHealth {
    let inventory = state.allocator.inventory();
    InventoryHealth {
        clusters: inventory.snapshot().await.len(),
        refreshed_at: inventory.refreshed_at().await,
    }
}

fn uptime_seconds() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_state, create_test_state_with_clusters};
    use axum::{body::Body, http::Request};
    use kc_connectors::MockClusterSource;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn health(app: Router, uri: &str) -> (StatusCode, HealthResponse) {
        let response = app.oneshot(get(uri)).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_pool_and_leases() {
        let state = create_test_state();
        state.allocator.allocate(60).await.unwrap();
        let app = routes().with_state(state);

        let (status, body) = health(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "healthy");
        assert_eq!(body.inventory.clusters, 2);
        assert_eq!(body.active_leases, 1);
    }

    #[tokio::test]
    async fn test_empty_pool_is_degraded() {
        let app = routes().with_state(create_test_state_with_clusters(&[]));
        let (_, body) = health(app, "/health").await;
        assert_eq!(body.status, "degraded");
    }

    #[tokio::test]
    async fn test_detailed_health_with_unhealthy_source() {
        let source = Arc::new(MockClusterSource::new("mock", Vec::new()));
        source.set_healthy(false).await;
        let app = routes().with_state(create_test_state().with_source(source));

        let (status, body) = health(app, "/health/detailed").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "unhealthy");
        assert_eq!(body.source.unwrap().source_type, "mock");
    }

    #[tokio::test]
    async fn test_readiness_and_liveness() {
        let app = routes().with_state(create_test_state());
        let response = app.clone().oneshot(get("/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
