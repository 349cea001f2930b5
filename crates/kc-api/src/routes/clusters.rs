//! Inventory routes.

use axum::{extract::State, routing::get, Json, Router};

use crate::dto::ClusterResponse;
use crate::error::ErrorResponse;
use crate::state::AppState;

/// Creates the cluster router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_clusters))
}

/// Lists the pool in selection order.
#[utoipa::path(
    get,
    path = "/api/v1/clusters",
    responses(
        (status = 200, description = "Clusters in selection order", body = [ClusterResponse]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Clusters"
)]
pub async fn list_clusters(State(state): State<AppState>) -> Json<Vec<ClusterResponse>> {
    let statuses = state.allocator.cluster_statuses().await;
    Json(statuses.into_iter().map(ClusterResponse::from).collect())
}
