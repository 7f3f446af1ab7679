//! Request-level middleware shared by every service.
//!
//! # Responsibilities
//! - Assign a unique request ID (UUID v4) to each request
//! - Trace request/response with structured spans
//! - Bound request handling time
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The ID is echoed on the response for correlation

use std::time::Duration;

use axum::http::{HeaderName, StatusCode};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Default bound on handling a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wrap a service router with request ID, tracing and timeout layers.
pub fn with_request_layers(router: Router, request_timeout: Duration) -> Router {
    let x_request_id = HeaderName::from_static(X_REQUEST_ID);

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                request_timeout,
            ))
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}
