//! Lease routes.
//!
//! `POST` hands out the first free cluster together with its kubeconfig;
//! `DELETE` gives it back before the lease expires.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use kc_observability::lease_span;
use tracing::Instrument;
use uuid::Uuid;

use crate::dto::{CreateLeaseRequest, LeaseResponse, LeaseSummary};
use crate::error::{ApiError, ErrorResponse};
use crate::state::AppState;

/// Creates the lease router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_leases).post(create_lease))
        .route("/:token", delete(delete_lease))
}

/// Leases the first unleased cluster.
#[utoipa::path(
    post,
    path = "/api/v1/leases",
    request_body = CreateLeaseRequest,
    responses(
        (status = 201, description = "Cluster leased", body = LeaseResponse),
        (status = 400, description = "Invalid lease duration", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 409, description = "All clusters are in use", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Leases"
)]
pub async fn create_lease(
    State(state): State<AppState>,
    Json(request): Json<CreateLeaseRequest>,
) -> Result<(StatusCode, Json<LeaseResponse>), ApiError> {
    let span = lease_span!("allocate", requested_secs = request.max_time_secs);
    let grant = state
        .allocator
        .allocate(request.max_time_secs)
        .instrument(span.clone())
        .await?;
    span.record("cluster", grant.cluster_name.as_str());
    span.record("token", tracing::field::display(grant.token));
    Ok((StatusCode::CREATED, Json(grant.into())))
}

/// Releases a lease.
#[utoipa::path(
    delete,
    path = "/api/v1/leases/{token}",
    params(("token" = Uuid, Path, description = "Lease token")),
    responses(
        (status = 204, description = "Lease released"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No active lease with this token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Leases"
)]
pub async fn delete_lease(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let span = lease_span!("release");
    span.record("token", tracing::field::display(token));
    let lease = state
        .allocator
        .release(token)
        .instrument(span.clone())
        .await?;
    span.record("cluster", lease.cluster_name.as_str());
    Ok(StatusCode::NO_CONTENT)
}

/// Lists active leases.
#[utoipa::path(
    get,
    path = "/api/v1/leases",
    responses(
        (status = 200, description = "Active leases, oldest first", body = [LeaseSummary]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "Leases"
)]
pub async fn list_leases(State(state): State<AppState>) -> Json<Vec<LeaseSummary>> {
    let leases = state.allocator.active_leases().await;
    Json(leases.into_iter().map(LeaseSummary::from).collect())
}
