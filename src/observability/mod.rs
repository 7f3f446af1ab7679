//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Retry executor, services, orchestrator produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (JSON in production)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Every boundary log carries the service name, address or attempt
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
