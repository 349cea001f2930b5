//! Bearer-token authentication for the lease API.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim()).filter(|t| !t.is_empty())
    } else {
        None
    }
}

/// Middleware that rejects requests without the configured bearer token.
///
/// Passes every request through when no token is configured.
pub async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.auth_token.as_ref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);

    let authorized = match presented {
        Some(token) => bool::from(
            token
                .as_bytes()
                .ct_eq(expected.expose_secret().as_bytes()),
        ),
        None => false,
    };

    if !authorized {
        counter!("kc_auth_failures_total").increment(1);
        warn!(
            uri = %request.uri(),
            has_credentials = presented.is_some(),
            "Rejected unauthenticated request"
        );
        return ApiError::Unauthorized("missing or invalid bearer token".to_string())
            .into_response();
    }

    next.run(request).await
}
