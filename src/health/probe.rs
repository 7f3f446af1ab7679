//! Dependency readiness probes.
//!
//! # Responsibilities
//! - Define the probe seam the orchestrator retries at startup
//! - Provide a TCP reachability probe for network dependencies
//! - Classify probe failures as transient or not

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::net::{lookup_host, TcpStream};

use crate::config::DependencyConfig;

/// Errors returned by a readiness probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{dependency} unreachable: {source}")]
    Connect {
        dependency: String,
        #[source]
        source: io::Error,
    },

    #[error("{dependency} address does not resolve: {source}")]
    Resolve {
        dependency: String,
        #[source]
        source: io::Error,
    },

    #[error("{dependency} did not answer within {timeout:?}")]
    Timeout { dependency: String, timeout: Duration },

    #[error("{dependency}: {message}")]
    Other { dependency: String, message: String },
}

/// A dependency that can report whether it is ready.
pub trait ReadinessProbe: Send + Sync {
    /// Dependency name for logs and metrics.
    fn name(&self) -> &str;

    /// One readiness check.
    fn ping(&self) -> BoxFuture<'_, Result<(), ProbeError>>;
}

/// Probe that succeeds when a TCP connection to the dependency opens.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    name: String,
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(name: impl Into<String>, address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            timeout,
        }
    }

    pub fn from_config(config: &DependencyConfig) -> Self {
        Self::new(&config.name, &config.address, config.timeout())
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn connect(&self) -> Result<(), ProbeError> {
        let addrs: Vec<_> = lookup_host(&self.address)
            .await
            .map_err(|source| ProbeError::Resolve {
                dependency: self.name.clone(),
                source,
            })?
            .collect();
        let addrs = resolved(&self.name, addrs)?;

        TcpStream::connect(&addrs[..])
            .await
            .map(drop)
            .map_err(|source| ProbeError::Connect {
                dependency: self.name.clone(),
                source,
            })
    }
}

/// A lookup that returned no addresses counts as not resolved yet.
fn resolved(dependency: &str, addrs: Vec<SocketAddr>) -> Result<Vec<SocketAddr>, ProbeError> {
    if addrs.is_empty() {
        return Err(ProbeError::Resolve {
            dependency: dependency.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"),
        });
    }
    Ok(addrs)
}

impl ReadinessProbe for TcpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), ProbeError>> {
        Box::pin(async move {
            tokio::time::timeout(self.timeout, self.connect())
                .await
                .unwrap_or_else(|_| {
                    Err(ProbeError::Timeout {
                        dependency: self.name.clone(),
                        timeout: self.timeout,
                    })
                })
        })
    }
}

/// Classifier for failures worth retrying while a dependency warms up.
///
/// Refused, reset and aborted connections, timeouts, and addresses that do
/// not resolve yet are transient. Everything else is not.
pub fn classify_transient(err: &ProbeError) -> Option<String> {
    match err {
        ProbeError::Timeout { .. } => Some("timeout".to_string()),
        ProbeError::Connect { source, .. } => match source.kind() {
            io::ErrorKind::ConnectionRefused => Some("connection refused".to_string()),
            io::ErrorKind::ConnectionReset => Some("connection reset".to_string()),
            io::ErrorKind::ConnectionAborted => Some("connection aborted".to_string()),
            io::ErrorKind::TimedOut => Some("timeout".to_string()),
            _ => None,
        },
        // The name may simply not be registered yet.
        ProbeError::Resolve { .. } => Some("unresolved address".to_string()),
        ProbeError::Other { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpProbe::new("local", addr.to_string(), Duration::from_secs(1));
        assert!(probe.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_tcp_probe_refused_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = TcpProbe::new("gone", addr.to_string(), Duration::from_secs(1));
        let err = probe.ping().await.unwrap_err();
        assert_eq!(classify_transient(&err).as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_classification() {
        let timeout = ProbeError::Timeout {
            dependency: "db".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(classify_transient(&timeout).as_deref(), Some("timeout"));

        let denied = ProbeError::Connect {
            dependency: "db".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(classify_transient(&denied), None);

        let other = ProbeError::Other {
            dependency: "db".into(),
            message: "wrong password".into(),
        };
        assert_eq!(classify_transient(&other), None);

        let unresolved = ProbeError::Resolve {
            dependency: "db".into(),
            source: io::Error::new(io::ErrorKind::Other, "no such host"),
        };
        assert_eq!(classify_transient(&unresolved).as_deref(), Some("unresolved address"));
    }

    #[test]
    fn test_empty_lookup_is_transient() {
        let err = resolved("cache", Vec::new()).unwrap_err();
        assert!(matches!(err, ProbeError::Resolve { .. }));
        assert_eq!(classify_transient(&err).as_deref(), Some("unresolved address"));

        let addr: SocketAddr = "127.0.0.1:6379".parse().unwrap();
        assert_eq!(resolved("cache", vec![addr]).unwrap(), vec![addr]);
    }

    #[tokio::test]
    async fn test_unresolvable_name_is_transient() {
        let probe = TcpProbe::new("later", "not-registered.invalid:6379", Duration::from_secs(2));
        let err = probe.ping().await.unwrap_err();
        assert!(matches!(err, ProbeError::Resolve { .. } | ProbeError::Timeout { .. }));
        assert!(classify_transient(&err).is_some());
    }

    #[test]
    fn test_from_config() {
        let probe = TcpProbe::from_config(&DependencyConfig::default());
        assert_eq!(probe.name(), "redis");
        assert_eq!(probe.address(), "redis-server:6379");
    }
}
