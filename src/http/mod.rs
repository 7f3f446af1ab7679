//! HTTP glue subsystem.
//!
//! # Data Flow
//! ```text
//! Service listener (lifecycle::service)
//!     → server.rs (accept loop, graceful drain)
//!     → request.rs (request ID, tracing, timeout)
//!     → health.rs / dependencies.rs (handlers)
//! ```

pub mod dependencies;
pub mod health;
pub mod request;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::health::ReadinessProbe;

pub use request::X_REQUEST_ID;

/// Router for the main server: dependency ping endpoint.
pub fn app_router(probes: Vec<Arc<dyn ReadinessProbe>>, request_timeout: Duration) -> Router {
    request::with_request_layers(dependencies::router(probes), request_timeout)
}

/// Router for the health-check listener.
pub fn health_router(request_timeout: Duration) -> Router {
    request::with_request_layers(health::router(), request_timeout)
}
