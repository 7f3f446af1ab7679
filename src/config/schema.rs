//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the process.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration, passed by value into the orchestrator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment (e.g. "production", "development").
    ///
    /// Left empty in a file, it is filled from the `ENVIRONMENT` variable.
    pub environment: String,

    /// Listeners to start, in start (and stop) order.
    pub services: Vec<ListenerSpec>,

    /// External dependencies checked before the process reports ready.
    pub dependencies: Vec<DependencyConfig>,

    /// Startup and shutdown behavior.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: String::new(),
            services: vec![
                ListenerSpec::new("main-server", "0.0.0.0:80"),
                ListenerSpec::new("health-checker", "0.0.0.0:8080"),
            ],
            dependencies: vec![DependencyConfig::default()],
            lifecycle: LifecycleConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// A named listener. Identity is the bind address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ListenerSpec {
    /// Logical name used in logs and metrics.
    pub name: String,

    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl ListenerSpec {
    pub fn new(name: impl Into<String>, bind_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bind_address: bind_address.into(),
        }
    }
}

/// External dependency probed at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DependencyConfig {
    /// Dependency identifier for logging/metrics.
    pub name: String,

    /// Address to probe (e.g., "redis-server:6379").
    pub address: String,

    /// Timeout for a single probe in milliseconds.
    pub timeout_ms: u64,

    /// Retry policy applied to the probe.
    pub retry: RetryConfig,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            name: "redis".to_string(),
            address: "redis-server:6379".to_string(),
            timeout_ms: 10_000,
            retry: RetryConfig {
                max_attempts: 2,
                max_backoff_ms: 3_000,
                ..RetryConfig::default()
            },
        }
    }
}

impl DependencyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (0 disables the call entirely).
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_backoff_ms: u64,

    /// Ceiling for the exponential backoff in milliseconds.
    pub max_backoff_ms: u64,

    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 1_000,
            jitter: false,
        }
    }
}

/// What to do when a readiness probe exhausts its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeFailurePolicy {
    /// Log and continue in degraded mode.
    #[default]
    Warn,
    /// Abort startup.
    Fatal,
}

/// Startup and shutdown behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Deadline for each service to drain in-flight requests, in seconds.
    pub drain_timeout_secs: u64,

    /// Reaction to an exhausted readiness probe.
    pub probe_failure: ProbeFailurePolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
            probe_failure: ProbeFailurePolicy::Warn,
        }
    }
}

impl LifecycleConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Force JSON log output regardless of environment.
    pub json: bool,

    /// Prometheus scrape address; metrics are not exported when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = AppConfig::default();
        assert_eq!(config.services[0], ListenerSpec::new("main-server", "0.0.0.0:80"));
        assert_eq!(config.services[1], ListenerSpec::new("health-checker", "0.0.0.0:8080"));
        assert_eq!(config.dependencies[0].retry.max_attempts, 2);
        assert_eq!(config.dependencies[0].retry.max_backoff_ms, 3_000);
        assert_eq!(config.lifecycle.drain_timeout(), Duration::from_secs(30));
        assert_eq!(config.lifecycle.probe_failure, ProbeFailurePolicy::Warn);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [lifecycle]
            probe_failure = "fatal"

            [[services]]
            name = "api"
            bind_address = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.services, vec![ListenerSpec::new("api", "127.0.0.1:9000")]);
        assert_eq!(config.lifecycle.probe_failure, ProbeFailurePolicy::Fatal);
        assert_eq!(config.lifecycle.drain_timeout_secs, 30);
        assert_eq!(config.dependencies.len(), 1);
    }
}
