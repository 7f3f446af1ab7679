//! OS signal handling.
//!
//! # Responsibilities
//! - Register the process interrupt handlers (SIGINT, plus SIGTERM on unix)
//! - Translate the first signal into the shutdown event
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - One forwarding task is the only subscriber to the OS notification
//! - Signals after the first are absorbed by the event's one-shot guard

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// Spawn the task that forwards the first interrupt into `shutdown`.
///
/// The task also exits if `shutdown` fires for any other reason.
pub fn forward_interrupts(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = wait_for_interrupt() => match signal {
                Ok(name) => {
                    tracing::info!(signal = name, "Shutdown signal received");
                    shutdown.trigger();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install signal handler");
                }
            },
            _ = shutdown.wait() => {}
        }
    })
}

#[cfg(unix)]
async fn wait_for_interrupt() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
}
