//! TCP listener binding.
//!
//! # Responsibilities
//! - Resolve a service's configured bind address
//! - Bind the listening socket exactly once
//! - Classify bind failures for the caller

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{lookup_host, TcpListener};

use crate::config::ListenerSpec;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured address does not resolve as `host:port`.
    #[error("invalid bind address '{address}': {source}")]
    InvalidAddress {
        address: String,
        source: io::Error,
    },
    /// The OS refused the bind (address in use, permission denied, ...).
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: io::Error,
    },
}

/// Bind a TCP listener for the given spec.
///
/// Hostnames are resolved first; the first resolved address is bound.
pub async fn bind(spec: &ListenerSpec) -> Result<TcpListener, ListenerError> {
    let addr = resolve(&spec.bind_address).await?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    tracing::info!(
        service = %spec.name,
        address = %local_addr,
        "Listener bound"
    );

    Ok(listener)
}

async fn resolve(address: &str) -> Result<SocketAddr, ListenerError> {
    let invalid = |source: io::Error| ListenerError::InvalidAddress {
        address: address.to_string(),
        source,
    };

    lookup_host(address)
        .await
        .map_err(invalid)?
        .next()
        .ok_or_else(|| {
            invalid(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "address resolved to nothing",
            ))
        })
}
