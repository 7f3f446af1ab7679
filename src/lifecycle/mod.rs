//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs, orchestrator.rs):
//!     Warm up dependencies (retry) → Start services in order → Ready
//!
//! Running (service.rs):
//!     One serve loop per service; faults reported to the orchestrator
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → Trigger the shutdown event (shutdown.rs)
//!
//! Shutdown (orchestrator.rs, service.rs):
//!     Event fired → Stop accepting → Drain connections → Exit code
//! ```
//!
//! # Design Decisions
//! - Ordered startup: dependencies first, listeners last
//! - Stop order matches start order; each service has its own deadline
//! - Shutdown has timeout: forced close after deadline

pub mod orchestrator;
pub mod service;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use orchestrator::{
    Exit, Orchestrator, OrchestratorState, ShutdownCause, ShutdownReport, StartupError,
};
pub use service::{LifecycleError, Service, ServiceFault, ServiceState};
pub use shutdown::Shutdown;
pub use startup::DependencyCheck;
