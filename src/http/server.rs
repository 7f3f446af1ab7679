//! HTTP accept loop with graceful drain.
//!
//! # Responsibilities
//! - Accept TCP connections and serve them with the service's router
//! - Stop accepting when asked, releasing the listening socket
//! - Let in-flight requests finish up to the drain deadline
//! - Force-close whatever is left after the deadline
//!
//! # Design Decisions
//! - One task per connection, owned by a `JoinSet` so they can be aborted
//! - HTTP/1.1 via hyper; keep-alive connections are closed once idle
//! - Per-connection accept errors are skipped; anything else ends the loop

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{body::Body, Router};
use hyper::{body::Incoming, server::conn::http1, service::service_fn, Request};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tower::Service;

/// Serve `router` on `listener` until `stop` resolves (or its sender is dropped).
///
/// Returns `Ok(())` after a graceful stop, whether or not the drain deadline
/// was met, or the accept error that ended the loop.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut stop: oneshot::Receiver<()>,
    drain_timeout: Duration,
    service: String,
) -> io::Result<()> {
    let (drain_tx, drain_rx) = watch::channel(());
    let mut connections = JoinSet::new();

    let result = loop {
        tokio::select! {
            _ = &mut stop => break Ok(()),
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(service = %service, peer_addr = %peer, "Connection accepted");
                    let drain = drain_rx.clone();
                    spawn_connection(&mut connections, stream, peer, router.clone(), drain);
                }
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(
                        service = %service,
                        error = %e,
                        "Accept failed for a single connection"
                    );
                }
                Err(e) => break Err(e),
            },
        }

        // Reap finished connections so the set does not grow unbounded.
        while connections.try_join_next().is_some() {}
    };

    drop(listener);
    let _ = drain_tx.send(());

    let in_flight = connections.len();
    if in_flight > 0 {
        tracing::info!(service = %service, connections = in_flight, "Draining connections");
    }

    let drained = tokio::time::timeout(drain_timeout, async {
        while connections.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            service = %service,
            remaining = connections.len(),
            timeout = ?drain_timeout,
            "Drain deadline exceeded, forcing close"
        );
        connections.shutdown().await;
    }

    result
}

fn spawn_connection(
    connections: &mut JoinSet<()>,
    stream: TcpStream,
    peer: SocketAddr,
    router: Router,
    mut drain: watch::Receiver<()>,
) {
    connections.spawn(async move {
        let handler = service_fn(move |request: Request<Incoming>| {
            router.clone().call(request.map(Body::new))
        });
        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), handler);
        tokio::pin!(conn);

        let mut draining = false;
        loop {
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(e) = result {
                        tracing::debug!(
                            peer_addr = %peer,
                            error = %e,
                            "Connection closed with error"
                        );
                    }
                    break;
                }
                _ = drain.changed(), if !draining => {
                    draining = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    });
}

/// Errors that concern one connection rather than the listening socket.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
