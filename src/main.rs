//! multiserve
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │                 ORCHESTRATOR                 │
//!                  │                                              │
//!   config.toml ──▶│  warm up dependencies ──▶ start services     │
//!                  │  (retry + backoff)         (in order)        │
//!                  │                                │             │
//!   SIGINT/TERM ──▶│  signal forwarder ──▶ shutdown event         │
//!                  │                                │             │
//!                  │                     stop services, drain     │
//!                  │                     (deadline per service)   │
//!                  └──────────────────────────────────────────────┘
//!                        │                         │
//!                  ┌─────▼──────┐           ┌──────▼───────┐
//!                  │ main-server│           │health-checker│
//!                  │ :80        │           │ :8080        │
//!                  └────────────┘           └──────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use multiserve::config::{self, AppConfig, ListenerSpec};
use multiserve::health::ReadinessProbe;
use multiserve::http::{self, request::DEFAULT_REQUEST_TIMEOUT};
use multiserve::lifecycle::{DependencyCheck, Exit, Orchestrator, StartupError};
use multiserve::observability::{logging, metrics};

/// Name of the listener that serves the health endpoint.
const HEALTH_SERVICE: &str = "health-checker";

#[derive(Parser)]
#[command(name = "multiserve")]
#[command(about = "Runs the configured listeners until interrupted", long_about = None)]
struct Cli {
    /// Path to a TOML config file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match config::load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load {}: {e}", path.display());
                return Exit::StartupFailed.into();
            }
        },
        None => config::loader::default_config(),
    };

    if let Err(e) = logging::init_logging(&config.observability, &config.environment) {
        eprintln!("failed to initialize logging: {e}");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        services = config.services.len(),
        dependencies = config.dependencies.len(),
        "multiserve starting"
    );

    if let Some(address) = &config.observability.metrics_address {
        match address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => {
                tracing::error!(metrics_address = %address, "Failed to parse metrics address");
            }
        }
    }

    match build(config) {
        Ok(orchestrator) => orchestrator.run().await.into(),
        Err(e) => {
            tracing::error!(error = %e, "Invalid service setup");
            Exit::StartupFailed.into()
        }
    }
}

fn build(config: AppConfig) -> Result<Orchestrator, StartupError> {
    let checks: Vec<DependencyCheck> = config
        .dependencies
        .iter()
        .map(DependencyCheck::from_config)
        .collect();
    let probes: Vec<Arc<dyn ReadinessProbe>> = checks.iter().map(DependencyCheck::probe).collect();

    let mut orchestrator = Orchestrator::new(config.lifecycle);
    for check in checks {
        orchestrator.add_dependency(check);
    }
    for spec in config.services {
        let router = router_for(&spec, &probes);
        orchestrator.add_service(spec, router)?;
    }
    Ok(orchestrator)
}

fn router_for(spec: &ListenerSpec, probes: &[Arc<dyn ReadinessProbe>]) -> axum::Router {
    if spec.name == HEALTH_SERVICE {
        http::health_router(DEFAULT_REQUEST_TIMEOUT)
    } else {
        http::app_router(probes.to_vec(), DEFAULT_REQUEST_TIMEOUT)
    }
}
