//! HTTP middleware for the lease server.
//!
//! Request logs name the matched route template (`/api/v1/leases/:token`)
//! rather than the raw path. The lease span opened by the handler carries
//! the concrete token and cluster.

use axum::{
    extract::{MatchedPath, Request},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Request ID header name.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Longest client-supplied request ID that is passed through.
const MAX_REQUEST_ID_LEN: usize = 64;

/// Request ID extension type.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    /// Keeps a client-supplied ID only if it is short and made of
    /// `[A-Za-z0-9._-]`, so it can be echoed and logged verbatim.
    fn from_client(value: &str) -> Option<Self> {
        let acceptable = !value.is_empty()
            && value.len() <= MAX_REQUEST_ID_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
        acceptable.then(|| Self(value.to_string()))
    }

    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Tags each request with an ID, echoed back in the response.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(RequestId::from_client)
        .unwrap_or_else(RequestId::generate);

    let header_value = HeaderValue::from_str(&id.0).ok();
    request.extensions_mut().insert(id);

    let mut response = next.run(request).await;
    if let Some(value) = header_value {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Logs one line per completed request.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| format!("unmatched {}", request.uri().path()));
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        warn!(%request_id, %method, %route, status, duration_ms, "Request failed");
    } else {
        info!(%request_id, %method, %route, status, duration_ms, "Request completed");
    }

    response
}

/// Adds security headers to every response.
///
/// Lease responses carry cluster credentials, so nothing is cached and
/// no referrer leaks the URL.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn, routing::delete, Extension, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/api/v1/leases/:token",
                delete(|Extension(id): Extension<RequestId>| async move { id.0 }),
            )
            .layer(from_fn(security_headers))
            .layer(from_fn(request_logging))
            .layer(from_fn(request_id))
    }

    async fn send(request_id: Option<&str>) -> Response {
        let mut builder = axum::http::Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/leases/{}", Uuid::new_v4()));
        if let Some(id) = request_id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn echoed_id(response: &Response) -> &str {
        response.headers()[REQUEST_ID_HEADER].to_str().unwrap()
    }

    #[test]
    fn test_client_request_id_rules() {
        assert!(RequestId::from_client("build-42.retry_1").is_some());
        assert!(RequestId::from_client(&"a".repeat(MAX_REQUEST_ID_LEN)).is_some());

        assert!(RequestId::from_client("").is_none());
        assert!(RequestId::from_client(&"a".repeat(MAX_REQUEST_ID_LEN + 1)).is_none());
        assert!(RequestId::from_client("has space").is_none());
        assert!(RequestId::from_client("line\nbreak").is_none());
    }

    #[tokio::test]
    async fn test_valid_request_id_is_echoed() {
        let response = send(Some("ci-run-17")).await;
        assert_eq!(echoed_id(&response), "ci-run-17");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ci-run-17");
    }

    #[tokio::test]
    async fn test_invalid_request_id_is_replaced() {
        let response = send(Some("<script>")).await;
        assert!(Uuid::parse_str(echoed_id(&response)).is_ok());

        let response = send(None).await;
        assert!(Uuid::parse_str(echoed_id(&response)).is_ok());
    }

    #[tokio::test]
    async fn test_security_headers() {
        let response = send(None).await;
        let headers = response.headers();
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    }
}
