//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), or built-in defaults
//!     → loader.rs (parse & deserialize, resolve environment)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → passed by value into the orchestrator
//! ```
//!
//! # Design Decisions
//! - No ambient globals; the config is an explicit value
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, DependencyConfig, LifecycleConfig, ListenerSpec, ObservabilityConfig,
    ProbeFailurePolicy, RetryConfig,
};
