//! Multi-listener service runner.
//!
//! Starts several independent HTTP listeners, warms up external
//! dependencies with classified retries, and drains every listener within
//! a bounded deadline when the process is interrupted.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use lifecycle::{Exit, Orchestrator, Service, Shutdown};
pub use resilience::Retry;
