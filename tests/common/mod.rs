//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::{TcpListener, TcpStream};

use multiserve::config::ListenerSpec;

/// Spec for a service on an ephemeral loopback port.
pub fn ephemeral(name: &str) -> ListenerSpec {
    ListenerSpec::new(name, "127.0.0.1:0")
}

/// Router with an instant `/` and a `/slow/{ms}` route that sleeps.
pub fn test_router(name: &'static str) -> Router {
    Router::new()
        .route("/", get(move || async move { name }))
        .route(
            "/slow/{ms}",
            get(|axum::extract::Path(ms): axum::extract::Path<u64>| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                "done"
            }),
        )
}

/// Whether a TCP connection to `addr` can be opened.
#[allow(dead_code)]
pub async fn accepts_connections(addr: SocketAddr) -> bool {
    matches!(
        tokio::time::timeout(Duration::from_secs(1), TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// HTTP client that never reuses connections.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
