//! Startup dependency warm-up.
//!
//! # Responsibilities
//! - Ping every registered dependency before listeners start
//! - Retry transient failures under each dependency's policy
//! - Report the dependencies that never became ready
//!
//! # Design Decisions
//! - Dependencies are checked in registration order, one at a time
//! - Whether an unready dependency aborts startup is the orchestrator's call

use std::sync::Arc;

use crate::config::DependencyConfig;
use crate::health::{classify_transient, ProbeError, ReadinessProbe, TcpProbe};
use crate::observability::metrics;
use crate::resilience::Retry;

/// A readiness probe paired with the retry policy used at startup.
#[derive(Clone)]
pub struct DependencyCheck {
    probe: Arc<dyn ReadinessProbe>,
    retry: Retry<ProbeError>,
}

impl DependencyCheck {
    pub fn new(probe: Arc<dyn ReadinessProbe>, retry: Retry<ProbeError>) -> Self {
        Self { probe, retry }
    }

    /// TCP probe with transient-failure retries, built from configuration.
    pub fn from_config(config: &DependencyConfig) -> Self {
        Self::new(
            Arc::new(TcpProbe::from_config(config)),
            Retry::from_config(&config.retry).classify(classify_transient),
        )
    }

    pub fn name(&self) -> &str {
        self.probe.name()
    }

    pub fn probe(&self) -> Arc<dyn ReadinessProbe> {
        Arc::clone(&self.probe)
    }

    /// Ping the dependency until it answers or the retry policy gives up.
    pub async fn run(&self) -> Result<(), ProbeError> {
        let probe = &self.probe;
        self.retry.execute(|_, _| probe.ping()).await
    }
}

/// A dependency that was still unavailable after its retries.
#[derive(Debug)]
pub struct DependencyFailure {
    pub dependency: String,
    pub error: ProbeError,
}

/// Run every check in order and collect the failures.
pub async fn warm_up(checks: &[DependencyCheck]) -> Vec<DependencyFailure> {
    let mut failures = Vec::new();

    for check in checks {
        match check.run().await {
            Ok(()) => {
                tracing::info!(dependency = %check.name(), "Dependency ready");
            }
            Err(error) => {
                tracing::warn!(
                    dependency = %check.name(),
                    error = %error,
                    "Dependency not ready"
                );
                metrics::record_probe_failure(check.name());
                failures.push(DependencyFailure {
                    dependency: check.name().to_string(),
                    error,
                });
            }
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails with a refused connection until `ready_after` pings were made.
    struct FlakyProbe {
        pings: AtomicU32,
        ready_after: u32,
    }

    impl ReadinessProbe for FlakyProbe {
        fn name(&self) -> &str {
            "flaky"
        }

        fn ping(&self) -> BoxFuture<'_, Result<(), ProbeError>> {
            Box::pin(async move {
                let n = self.pings.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= self.ready_after {
                    Ok(())
                } else {
                    Err(ProbeError::Connect {
                        dependency: "flaky".into(),
                        source: std::io::ErrorKind::ConnectionRefused.into(),
                    })
                }
            })
        }
    }

    fn check(ready_after: u32, max_attempts: u32) -> (Arc<FlakyProbe>, DependencyCheck) {
        let probe = Arc::new(FlakyProbe {
            pings: AtomicU32::new(0),
            ready_after,
        });
        let retry = Retry::new(max_attempts, Duration::from_millis(4))
            .initial_backoff(Duration::from_millis(1))
            .classify(classify_transient);
        (probe.clone(), DependencyCheck::new(probe, retry))
    }

    #[tokio::test]
    async fn test_warm_up_retries_until_ready() {
        let (probe, check) = check(3, 5);
        let failures = warm_up(&[check]).await;
        assert!(failures.is_empty());
        assert_eq!(probe.pings.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_warm_up_reports_exhausted_dependency() {
        let (probe, check) = check(10, 2);
        let failures = warm_up(&[check]).await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].dependency, "flaky");
        assert_eq!(probe.pings.load(Ordering::SeqCst), 2);
    }
}
