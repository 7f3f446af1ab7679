//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dependency call (e.g. readiness ping):
//!     → retries.rs (run, classify failure, decide retry)
//!     → backoff.rs (delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Callers own retry policy content through classifiers
//! - Backoff doubles per retry and is capped; jitter is opt-in
//! - Meant for startup-time dependency checks, not steady-state traffic

pub mod backoff;
pub mod retries;

pub use retries::{retry, Classifier, Retry};
