//! Request body limits.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Reject bodies larger than `max_bytes` with 413 Payload Too Large.
pub fn apply_body_limit(router: Router, max_bytes: usize) -> Router {
    router
        .layer(DefaultBodyLimit::max(max_bytes))
        .layer(RequestBodyLimitLayer::new(max_bytes))
}
