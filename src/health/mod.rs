//! Dependency health subsystem.
//!
//! # Data Flow
//! ```text
//! Startup warm-up:
//!     Orchestrator
//!     → probe.rs (ping dependency)
//!     → resilience::retries (retry transient failures)
//!
//! On request:
//!     http::dependencies → probe.rs (single ping, no retry)
//! ```
//!
//! # Design Decisions
//! - Probes are a trait object so the core never depends on a client library
//! - Classification of failures lives next to the probe that produces them

pub mod probe;

pub use probe::{classify_transient, ProbeError, ReadinessProbe, TcpProbe};
