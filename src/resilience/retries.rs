//! Retry executor with caller-supplied error classification.
//!
//! # Responsibilities
//! - Run an operation up to `max_attempts` times
//! - Ask the classifiers whether a failure is worth retrying
//! - Sleep with exponential backoff between attempts
//!
//! # Design Decisions
//! - The executor owns the control loop and timing only; which errors are
//!   retryable is decided by the classifiers the caller registers
//! - First classifier that claims an error wins and names the cause
//! - Unclassified errors fail fast, without sleeping
//! - No sleep after the final attempt
//! - `max_attempts == 0` never runs the operation and reports success

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::{Backoff, DEFAULT_INITIAL_BACKOFF};

/// Decides whether an error is retryable.
///
/// Returns `Some(cause)` to retry under that cause label, `None` when the
/// classifier does not consider the error transient.
pub type Classifier<E> = Arc<dyn Fn(&E) -> Option<String> + Send + Sync>;

/// A retry policy plus the loop that applies it.
pub struct Retry<E> {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    jitter: bool,
    classifiers: Vec<Classifier<E>>,
}

impl<E> Clone for Retry<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            initial_backoff: self.initial_backoff,
            max_backoff: self.max_backoff,
            jitter: self.jitter,
            classifiers: self.classifiers.clone(),
        }
    }
}

impl<E> fmt::Debug for Retry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("jitter", &self.jitter)
            .field("classifiers", &self.classifiers.len())
            .finish()
    }
}

impl<E: fmt::Display> Retry<E> {
    /// Create a policy with the default 100ms initial backoff and no classifiers.
    ///
    /// Without classifiers every error is treated as non-retryable.
    pub fn new(max_attempts: u32, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff,
            jitter: false,
            classifiers: Vec::new(),
        }
    }

    /// Build a policy from a dependency's retry settings.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.max_backoff_ms))
            .initial_backoff(Duration::from_millis(config.initial_backoff_ms))
            .jitter(config.jitter)
    }

    pub fn initial_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Register a classifier. Classifiers run in registration order.
    pub fn classify<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&E) -> Option<String> + Send + Sync + 'static,
    {
        self.classifiers.push(Arc::new(classifier));
        self
    }

    /// Register an already shared classifier.
    pub fn classifier(mut self, classifier: Classifier<E>) -> Self {
        self.classifiers.push(classifier);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Run `op` until it succeeds, fails with an unclassified error, or
    /// runs out of attempts.
    ///
    /// `op` receives the 0-based attempt index and the cause label of the
    /// previous failure (empty on the first attempt).
    pub async fn execute<F, Fut>(&self, mut op: F) -> Result<(), E>
    where
        F: FnMut(u32, String) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let mut backoff = self.backoff();
        let mut last_cause = String::new();

        for attempt in 0..self.max_attempts {
            let err = match op(attempt, last_cause.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            match self.next_delay(attempt, &err, &mut backoff, &mut last_cause) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(err),
            }
        }

        Ok(())
    }

    /// Blocking variant of [`Retry::execute`]; sleeps the calling thread.
    ///
    /// Meant for startup code that runs outside the async runtime.
    pub fn execute_blocking<F>(&self, mut op: F) -> Result<(), E>
    where
        F: FnMut(u32, &str) -> Result<(), E>,
    {
        let mut backoff = self.backoff();
        let mut last_cause = String::new();

        for attempt in 0..self.max_attempts {
            let err = match op(attempt, &last_cause) {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            match self.next_delay(attempt, &err, &mut backoff, &mut last_cause) {
                Some(delay) => std::thread::sleep(delay),
                None => return Err(err),
            }
        }

        Ok(())
    }

    fn backoff(&self) -> Backoff {
        Backoff::new(self.initial_backoff, self.max_backoff).jittered(self.jitter)
    }

    /// First classifier that claims the error supplies the cause.
    fn classify_error(&self, err: &E) -> Option<String> {
        self.classifiers.iter().find_map(|classifier| classifier(err))
    }

    /// Decide what follows a failed attempt.
    ///
    /// Returns the delay before the next attempt, or `None` when the loop
    /// must stop and surface `err`.
    fn next_delay(
        &self,
        attempt: u32,
        err: &E,
        backoff: &mut Backoff,
        last_cause: &mut String,
    ) -> Option<Duration> {
        let Some(cause) = self.classify_error(err) else {
            tracing::debug!(attempt, error = %err, "Error is not retryable");
            return None;
        };

        if attempt + 1 >= self.max_attempts {
            tracing::debug!(
                attempts = self.max_attempts,
                cause = %cause,
                error = %err,
                "Retry attempts exhausted"
            );
            return None;
        }

        let delay = backoff.delay();
        tracing::info!(
            attempt,
            backoff = ?delay,
            cause = %cause,
            "Retrying after failure"
        );
        metrics::record_retry(&cause);

        backoff.advance();
        *last_cause = cause;
        Some(delay)
    }
}

/// Run `op` with the given attempt budget, backoff ceiling and classifiers.
pub async fn retry<E, F, Fut>(
    op: F,
    max_attempts: u32,
    max_backoff: Duration,
    classifiers: impl IntoIterator<Item = Classifier<E>>,
) -> Result<(), E>
where
    E: fmt::Display,
    F: FnMut(u32, String) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let policy = classifiers
        .into_iter()
        .fold(Retry::new(max_attempts, max_backoff), Retry::classifier);
    policy.execute(op).await
}
