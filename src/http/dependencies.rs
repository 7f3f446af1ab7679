//! On-demand dependency ping endpoint.
//!
//! # Responsibilities
//! - Ping every registered dependency once, without retries
//! - Report the first failure, or that all dependencies are up

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::health::ReadinessProbe;

#[derive(Clone)]
struct ProbeState {
    probes: Arc<Vec<Arc<dyn ReadinessProbe>>>,
}

#[derive(Debug, Serialize)]
struct Message {
    message: String,
}

/// `GET /dependencies/ping` over the given probes.
pub fn router(probes: Vec<Arc<dyn ReadinessProbe>>) -> Router {
    Router::new()
        .route("/dependencies/ping", get(ping_handler))
        .with_state(ProbeState {
            probes: Arc::new(probes),
        })
}

async fn ping_handler(State(state): State<ProbeState>) -> impl IntoResponse {
    for probe in state.probes.iter() {
        if let Err(e) = probe.ping().await {
            tracing::warn!(dependency = %probe.name(), error = %e, "Dependency ping failed");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Message {
                    message: format!("failed to ping {}", probe.name()),
                }),
            );
        }
    }

    let names: Vec<&str> = state.probes.iter().map(|p| p.name()).collect();
    let message = if names.is_empty() {
        "no dependencies registered".to_string()
    } else {
        format!("{} is up and running!", names.join(", "))
    };
    (StatusCode::OK, Json(Message { message }))
}
