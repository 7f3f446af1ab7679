//! Shutdown coordination for the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// One-shot shutdown event.
///
/// The event fires at most once; clones share the same event, and waiters
/// that arrive after it fired return immediately.
#[derive(Debug, Clone)]
pub struct Shutdown {
    /// Set by the first trigger.
    triggered: Arc<AtomicBool>,
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            triggered: Arc::new(AtomicBool::new(false)),
            tx,
        }
    }

    /// Fire the shutdown event.
    ///
    /// Returns `true` for the call that actually fired it; later calls are
    /// ignored and return `false`.
    pub fn trigger(&self) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        // No receivers is fine: waiters check the flag first.
        let _ = self.tx.send(());
        true
    }

    /// Whether the event has fired.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Wait until the event fires. Returns immediately if it already has.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        if self.is_triggered() {
            return;
        }
        // Lagged or closed both mean the event was sent or can no longer be.
        let _ = rx.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
