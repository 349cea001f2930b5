//! API routes.

pub mod clusters;
pub mod health;
pub mod leases;
pub mod metrics;

use crate::auth::require_auth;
use crate::state::AppState;
use axum::{middleware, Router};

/// Creates the main API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        .merge(health::routes())
        .merge(metrics::routes())
        .with_state(state)
}

/// Authenticated routes under `/api/v1`.
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/leases", leases::routes())
        .nest("/clusters", clusters::routes())
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
