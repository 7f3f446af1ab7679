//! Process-level orchestration of services and dependencies.
//!
//! # States
//! ```text
//! Idle → Starting → Ready → ShuttingDown → Terminated
//! Starting → Terminated: a service failed to start (or a fatal dependency)
//! ```
//!
//! # Responsibilities
//! - Warm up dependencies through the retry executor
//! - Start every service in registration order
//! - Forward the process interrupt into the shutdown event
//! - Stop every service and fold the results into an exit code
//!
//! # Design Decisions
//! - Fail fast on start: later services are not attempted, earlier ones are stopped
//! - Stop never short-circuits; all services get their own drain deadline,
//!   and the deadlines run concurrently
//! - A serve-loop fault is treated like a shutdown request plus a failure

use std::fmt;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use axum::Router;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{LifecycleConfig, ListenerSpec, ProbeFailurePolicy};
use crate::health::ProbeError;
use crate::lifecycle::service::{LifecycleError, Service, ServiceFault};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::lifecycle::startup::{self, DependencyCheck};

/// Orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Starting,
    Ready,
    ShuttingDown,
    Terminated,
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrchestratorState::Idle => "idle",
            OrchestratorState::Starting => "starting",
            OrchestratorState::Ready => "ready",
            OrchestratorState::ShuttingDown => "shutting_down",
            OrchestratorState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Reasons startup was aborted.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Service(#[from] LifecycleError),

    #[error("dependency '{dependency}' is not ready: {source}")]
    Dependency {
        dependency: String,
        #[source]
        source: ProbeError,
    },

    #[error("services '{first}' and '{second}' both bind {address}")]
    DuplicateListener {
        first: String,
        second: String,
        address: String,
    },

    #[error("orchestrator cannot start from state {0}")]
    InvalidState(OrchestratorState),
}

/// Why the orchestrator left the ready state.
#[derive(Debug)]
pub enum ShutdownCause {
    /// The shutdown event fired (interrupt or explicit trigger).
    Signal,
    /// A serve loop failed after binding.
    Fault(ServiceFault),
}

/// Outcome of the stop phase.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Stop failures, in registration order.
    pub failures: Vec<LifecycleError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Every service stopped cleanly.
    Clean,
    /// A service failed to stop, or a serve loop failed.
    ShutdownFailed,
    /// Startup was aborted.
    StartupFailed,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Exit::Clean => 0,
            Exit::ShutdownFailed => 1,
            Exit::StartupFailed => 2,
        }
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Owns the services of one process and drives them through their lifecycle.
pub struct Orchestrator {
    services: Vec<Service>,
    checks: Vec<DependencyCheck>,
    probe_failure: ProbeFailurePolicy,
    drain_timeout: Duration,
    shutdown: Shutdown,
    state: OrchestratorState,
    fault_tx: mpsc::UnboundedSender<ServiceFault>,
    fault_rx: mpsc::UnboundedReceiver<ServiceFault>,
}

impl Orchestrator {
    pub fn new(config: LifecycleConfig) -> Self {
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        Self {
            services: Vec::new(),
            checks: Vec::new(),
            probe_failure: config.probe_failure,
            drain_timeout: config.drain_timeout(),
            shutdown: Shutdown::new(),
            state: OrchestratorState::Idle,
            fault_tx,
            fault_rx,
        }
    }

    /// Register a service. Services start and stop in registration order.
    pub fn add_service(
        &mut self,
        spec: ListenerSpec,
        router: Router,
    ) -> Result<&mut Self, StartupError> {
        if let Some(existing) = self
            .services
            .iter()
            .find(|s| same_bind_address(&s.spec().bind_address, &spec.bind_address))
        {
            return Err(StartupError::DuplicateListener {
                first: existing.name().to_string(),
                second: spec.name,
                address: spec.bind_address,
            });
        }

        let service = Service::new(spec, router)
            .with_drain_timeout(self.drain_timeout)
            .with_fault_reporter(self.fault_tx.clone());
        self.services.push(service);
        Ok(self)
    }

    /// Register a dependency to warm up before services start.
    pub fn add_dependency(&mut self, check: DependencyCheck) -> &mut Self {
        self.checks.push(check);
        self
    }

    /// A handle that fires the shutdown event.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Bound address of the named service, while it runs.
    pub fn local_addr(&self, service: &str) -> Option<SocketAddr> {
        self.services
            .iter()
            .find(|s| s.name() == service)
            .and_then(Service::local_addr)
    }

    fn transition(&mut self, next: OrchestratorState) {
        tracing::debug!(from = %self.state, to = %next, "Orchestrator state change");
        self.state = next;
    }

    /// Warm up dependencies, then start every service.
    ///
    /// On failure the services already started are stopped and the
    /// orchestrator ends in `Terminated`.
    pub async fn start(&mut self) -> Result<(), StartupError> {
        if self.state != OrchestratorState::Idle {
            return Err(StartupError::InvalidState(self.state));
        }
        self.transition(OrchestratorState::Starting);

        for failure in startup::warm_up(&self.checks).await {
            match self.probe_failure {
                ProbeFailurePolicy::Warn => {
                    tracing::warn!(
                        dependency = %failure.dependency,
                        "Continuing without dependency"
                    );
                }
                ProbeFailurePolicy::Fatal => {
                    tracing::error!(
                        dependency = %failure.dependency,
                        error = %failure.error,
                        "Required dependency not ready, aborting startup"
                    );
                    self.transition(OrchestratorState::Terminated);
                    return Err(StartupError::Dependency {
                        dependency: failure.dependency,
                        source: failure.error,
                    });
                }
            }
        }

        for index in 0..self.services.len() {
            if let Err(e) = self.services[index].start().await {
                tracing::error!(
                    service = %self.services[index].name(),
                    error = %e,
                    "Service failed to start, aborting startup"
                );
                self.stop_services().await;
                self.transition(OrchestratorState::Terminated);
                return Err(e.into());
            }
        }

        self.transition(OrchestratorState::Ready);
        tracing::info!(services = self.services.len(), "All services started");
        Ok(())
    }

    /// Block until the shutdown event fires or a serve loop fails.
    ///
    /// A serve-loop failure fires the shutdown event itself.
    pub async fn wait(&mut self) -> ShutdownCause {
        tokio::select! {
            _ = self.shutdown.wait() => ShutdownCause::Signal,
            Some(fault) = self.fault_rx.recv() => {
                tracing::error!(
                    service = %fault.service,
                    error = %fault.error,
                    "Service failed while running, shutting down"
                );
                self.shutdown.trigger();
                ShutdownCause::Fault(fault)
            }
        }
    }

    /// Stop every service, collecting failures without short-circuiting.
    pub async fn stop(&mut self) -> ShutdownReport {
        if self.state == OrchestratorState::Terminated {
            return ShutdownReport::default();
        }
        self.transition(OrchestratorState::ShuttingDown);

        let report = self.stop_services().await;

        self.transition(OrchestratorState::Terminated);
        report
    }

    async fn stop_services(&mut self) -> ShutdownReport {
        let results = join_all(self.services.iter_mut().map(|service| service.stop())).await;

        let mut failures = Vec::new();
        for (service, result) in self.services.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!(service = %service.name(), error = %e, "Service failed to stop");
                failures.push(e);
            }
        }
        ShutdownReport { failures }
    }

    /// Start, wait for the interrupt signal, stop. Returns the exit status.
    pub async fn run(mut self) -> Exit {
        if let Err(e) = self.start().await {
            tracing::error!(error = %e, "Startup failed");
            return Exit::StartupFailed;
        }

        let _forwarder = signals::forward_interrupts(self.shutdown.clone());

        let cause = self.wait().await;
        let report = self.stop().await;

        let exit = match cause {
            ShutdownCause::Signal if report.is_clean() => Exit::Clean,
            _ => Exit::ShutdownFailed,
        };

        if exit == Exit::Clean {
            tracing::info!("Shutdown successfully");
        } else {
            tracing::error!(
                stop_failures = report.failures.len(),
                exit_code = exit.code(),
                "Shutdown completed with errors"
            );
        }
        exit
    }
}

/// Two bind addresses collide unless they differ or request an ephemeral port.
fn same_bind_address(a: &str, b: &str) -> bool {
    match (a.parse::<SocketAddr>(), b.parse::<SocketAddr>()) {
        (Ok(a), Ok(b)) => a.port() != 0 && a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    fn router() -> Router {
        Router::new().route("/", get(|| async { "ok" }))
    }

    fn config() -> LifecycleConfig {
        LifecycleConfig {
            drain_timeout_secs: 1,
            ..LifecycleConfig::default()
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Exit::Clean.code(), 0);
        assert_eq!(Exit::ShutdownFailed.code(), 1);
        assert_eq!(Exit::StartupFailed.code(), 2);
    }

    #[test]
    fn test_same_bind_address() {
        assert!(same_bind_address("127.0.0.1:80", "127.0.0.1:80"));
        assert!(!same_bind_address("127.0.0.1:80", "127.0.0.1:81"));
        assert!(!same_bind_address("127.0.0.1:0", "127.0.0.1:0"));
    }

    #[test]
    fn test_duplicate_listener_rejected() {
        let mut orchestrator = Orchestrator::new(config());
        orchestrator
            .add_service(ListenerSpec::new("a", "127.0.0.1:9300"), router())
            .unwrap();
        let err = orchestrator
            .add_service(ListenerSpec::new("b", "127.0.0.1:9300"), router())
            .err()
            .unwrap();
        assert!(matches!(err, StartupError::DuplicateListener { .. }));
        assert_eq!(orchestrator.services().len(), 1);
    }

    #[tokio::test]
    async fn test_start_then_signal_then_stop() {
        let mut orchestrator = Orchestrator::new(config());
        orchestrator
            .add_service(ListenerSpec::new("a", "127.0.0.1:0"), router())
            .unwrap()
            .add_service(ListenerSpec::new("b", "127.0.0.1:0"), router())
            .unwrap();
        assert_eq!(orchestrator.state(), OrchestratorState::Idle);

        orchestrator.start().await.unwrap();
        assert_eq!(orchestrator.state(), OrchestratorState::Ready);
        assert!(orchestrator.local_addr("a").is_some());

        orchestrator.shutdown_handle().trigger();
        assert!(matches!(orchestrator.wait().await, ShutdownCause::Signal));

        let report = orchestrator.stop().await;
        assert!(report.is_clean());
        assert_eq!(orchestrator.state(), OrchestratorState::Terminated);
    }

    #[tokio::test]
    async fn test_start_twice_rejected() {
        let mut orchestrator = Orchestrator::new(config());
        orchestrator.start().await.unwrap();
        assert!(matches!(
            orchestrator.start().await,
            Err(StartupError::InvalidState(OrchestratorState::Ready))
        ));
    }

    #[tokio::test]
    async fn test_serve_fault_triggers_shutdown_and_fails_exit() {
        let mut orchestrator = Orchestrator::new(config());
        orchestrator
            .add_service(ListenerSpec::new("a", "127.0.0.1:0"), router())
            .unwrap();
        let faults = orchestrator.fault_tx.clone();
        let handle = orchestrator.shutdown_handle();

        let run = tokio::spawn(orchestrator.run());
        tokio::time::sleep(Duration::from_millis(100)).await;
        faults
            .send(ServiceFault {
                service: "a".to_string(),
                error: std::io::Error::other("accept failed"),
            })
            .unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("orchestrator did not shut down")
            .unwrap();
        assert_eq!(exit, Exit::ShutdownFailed);
        assert_eq!(exit.code(), 1);
        assert!(handle.is_triggered());
    }

    #[tokio::test]
    async fn test_fault_is_reported_as_shutdown_cause() {
        let mut orchestrator = Orchestrator::new(config());
        orchestrator
            .fault_tx
            .send(ServiceFault {
                service: "a".to_string(),
                error: std::io::Error::other("accept failed"),
            })
            .unwrap();

        let cause = orchestrator.wait().await;
        assert!(matches!(cause, ShutdownCause::Fault(ref fault) if fault.service == "a"));
        assert!(orchestrator.shutdown_handle().is_triggered());
    }

    #[tokio::test]
    async fn test_empty_orchestrator_runs_clean() {
        let orchestrator = Orchestrator::new(config());
        let handle = orchestrator.shutdown_handle();
        handle.trigger();
        assert_eq!(orchestrator.run().await, Exit::Clean);
    }
}
