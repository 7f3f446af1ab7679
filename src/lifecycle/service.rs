//! Lifecycle of a single listener + handler pair.
//!
//! # States
//! - Created: configured, nothing bound
//! - Running: listener bound, serve loop active on its own task
//! - Stopped: listener released; terminal
//!
//! # State Transitions
//! ```text
//! Created → Running: start() bound the listener
//! Created → Created: start() failed to bind
//! Running → Stopped: stop(), whether or not the drain deadline was met
//! ```
//!
//! # Design Decisions
//! - `start` returns once the socket is bound; serving happens in the background
//! - The listener is bound at most once; a stopped service is never restarted
//! - `stop` is idempotent and a no-op before `start`
//! - Serve-loop failures go to the fault channel instead of killing the process

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::ListenerSpec;
use crate::http::server;
use crate::net::{self, ListenerError};
use crate::observability::metrics;

/// Default deadline for in-flight requests to finish on stop.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle state of a [`Service`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    Running,
    Stopped,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceState::Created => "created",
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Errors from starting or stopping a service.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("service '{service}' failed to start: {source}")]
    Bind {
        service: String,
        #[source]
        source: ListenerError,
    },

    #[error("service '{0}' is already running")]
    AlreadyRunning(String),

    #[error("service '{0}' has been stopped and cannot be restarted")]
    Stopped(String),

    #[error("service '{service}' serve task failed: {source}")]
    Join {
        service: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// A serve loop that failed after its listener was bound.
#[derive(Debug)]
pub struct ServiceFault {
    pub service: String,
    pub error: io::Error,
}

struct Running {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

/// One network listener and the handler serving it.
pub struct Service {
    spec: ListenerSpec,
    router: Router,
    drain_timeout: Duration,
    state: ServiceState,
    local_addr: Option<SocketAddr>,
    running: Option<Running>,
    faults: Option<mpsc::UnboundedSender<ServiceFault>>,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("spec", &self.spec)
            .field("state", &self.state)
            .field("local_addr", &self.local_addr)
            .field("drain_timeout", &self.drain_timeout)
            .finish()
    }
}

impl Service {
    pub fn new(spec: ListenerSpec, router: Router) -> Self {
        Self {
            spec,
            router,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            state: ServiceState::Created,
            local_addr: None,
            running: None,
            faults: None,
        }
    }

    /// Override the drain deadline used by [`Service::stop`].
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Report serve-loop failures on `faults` instead of only logging them.
    pub fn with_fault_reporter(mut self, faults: mpsc::UnboundedSender<ServiceFault>) -> Self {
        self.faults = Some(faults);
        self
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ListenerSpec {
        &self.spec
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// The bound address, available while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener and start serving in the background.
    ///
    /// Bind failures are returned here and leave the service in `Created`.
    pub async fn start(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            ServiceState::Created => {}
            ServiceState::Running => {
                return Err(LifecycleError::AlreadyRunning(self.spec.name.clone()));
            }
            ServiceState::Stopped => {
                return Err(LifecycleError::Stopped(self.spec.name.clone()));
            }
        }

        let listener = net::bind(&self.spec)
            .await
            .map_err(|source| LifecycleError::Bind {
                service: self.spec.name.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().ok();

        let (stop_tx, stop_rx) = oneshot::channel();
        let name = self.spec.name.clone();
        let faults = self.faults.clone();
        let serve = server::serve(
            listener,
            self.router.clone(),
            stop_rx,
            self.drain_timeout,
            name.clone(),
        );

        let task = tokio::spawn(async move {
            let result = serve.await;
            if let Err(e) = &result {
                tracing::error!(service = %name, error = %e, "Serve loop failed");
                if let Some(faults) = faults {
                    let _ = faults.send(ServiceFault {
                        service: name,
                        error: io::Error::new(e.kind(), e.to_string()),
                    });
                }
            }
            result
        });

        self.local_addr = local_addr;
        self.running = Some(Running { stop_tx, task });
        self.state = ServiceState::Running;
        metrics::record_service_running(&self.spec.name, true);

        tracing::info!(
            service = %self.spec.name,
            address = ?self.local_addr,
            "Service started"
        );
        Ok(())
    }

    /// Stop accepting, drain in-flight requests, then release the listener.
    ///
    /// A no-op returning `Ok` unless the service is running. Exceeding the
    /// drain deadline is not an error; remaining connections are closed.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        let Some(Running { stop_tx, task }) = self.running.take() else {
            return Ok(());
        };

        tracing::info!(service = %self.spec.name, "Stopping service");
        let _ = stop_tx.send(());
        let joined = task.await;

        self.state = ServiceState::Stopped;
        self.local_addr = None;
        metrics::record_service_running(&self.spec.name, false);

        match joined {
            // A failed serve loop was already reported when it ended.
            Ok(_) => {
                tracing::info!(service = %self.spec.name, "Service stopped");
                Ok(())
            }
            Err(source) => Err(LifecycleError::Join {
                service: self.spec.name.clone(),
                source,
            }),
        }
    }
}
