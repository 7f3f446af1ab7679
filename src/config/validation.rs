//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses are `host:port`)
//! - Detect listeners colliding on one bind address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Port 0 requests an ephemeral port, so it never collides
//! - Hostnames are not resolved here; they collide only on identical text

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service #{index} has an empty name")]
    EmptyServiceName { index: usize },

    #[error("service '{service}' has invalid bind address '{address}'")]
    InvalidBindAddress { service: String, address: String },

    #[error("services '{first}' and '{second}' both bind {address}")]
    DuplicateBindAddress {
        first: String,
        second: String,
        address: String,
    },

    #[error("dependency #{index} has an empty name")]
    EmptyDependencyName { index: usize },

    #[error("dependency '{0}' is declared more than once")]
    DuplicateDependency(String),

    #[error("dependency '{0}' has an empty address")]
    EmptyDependencyAddress(String),

    #[error("dependency '{0}' must have a non-zero max_backoff_ms")]
    ZeroMaxBackoff(String),

    #[error("dependency '{0}' must have a non-zero timeout_ms")]
    ZeroProbeTimeout(String),

    #[error("lifecycle.drain_timeout_secs must be greater than zero")]
    ZeroDrainTimeout,
}

/// Check an [`AppConfig`] for semantic errors.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_services(config, &mut errors);
    validate_dependencies(config, &mut errors);

    if config.lifecycle.drain_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDrainTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_services(config: &AppConfig, errors: &mut Vec<ValidationError>) {
    let mut bound: Vec<(String, &str)> = Vec::new();

    for (index, spec) in config.services.iter().enumerate() {
        if spec.name.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName { index });
        }

        let Some(port) = bind_port(&spec.bind_address) else {
            errors.push(ValidationError::InvalidBindAddress {
                service: spec.name.clone(),
                address: spec.bind_address.clone(),
            });
            continue;
        };

        if port == 0 {
            continue;
        }

        let key = spec
            .bind_address
            .parse::<SocketAddr>()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| spec.bind_address.clone());

        if let Some((_, first)) = bound.iter().find(|(other, _)| *other == key) {
            errors.push(ValidationError::DuplicateBindAddress {
                first: first.to_string(),
                second: spec.name.clone(),
                address: key,
            });
        } else {
            bound.push((key, spec.name.as_str()));
        }
    }
}

/// Port of a `host:port` address, or `None` when it is not of that shape.
fn bind_port(address: &str) -> Option<u16> {
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Some(addr.port());
    }
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() || host.contains(':') {
        return None;
    }
    port.parse().ok()
}

fn validate_dependencies(config: &AppConfig, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();

    for (index, dep) in config.dependencies.iter().enumerate() {
        if dep.name.trim().is_empty() {
            errors.push(ValidationError::EmptyDependencyName { index });
        } else if !seen.insert(dep.name.as_str()) {
            errors.push(ValidationError::DuplicateDependency(dep.name.clone()));
        }

        if dep.address.trim().is_empty() {
            errors.push(ValidationError::EmptyDependencyAddress(dep.name.clone()));
        }
        if dep.retry.max_backoff_ms == 0 {
            errors.push(ValidationError::ZeroMaxBackoff(dep.name.clone()));
        }
        if dep.timeout_ms == 0 {
            errors.push(ValidationError::ZeroProbeTimeout(dep.name.clone()));
        }
    }
}
