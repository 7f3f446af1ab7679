//! Exponential backoff schedule with optional jitter.

use rand::Rng;
use std::time::Duration;

/// Delay before the first retry when no other value is configured.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Calculate the delay before retry number `retry` (1-based).
///
/// Returns `min(initial * 2^(retry - 1), max)`; retry `0` means "no retry yet"
/// and yields a zero delay.
pub fn calculate_backoff(retry: u32, initial: Duration, max: Duration) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u32.checked_pow(retry - 1).unwrap_or(u32::MAX);
    initial
        .checked_mul(exponential_base)
        .unwrap_or(Duration::MAX)
        .min(max)
}

/// Add up to 10% random jitter on top of a computed delay.
pub fn with_jitter(delay: Duration) -> Duration {
    let jitter_range = delay.as_millis() as u64 / 10;
    if jitter_range == 0 {
        return delay;
    }
    let jitter = rand::thread_rng().gen_range(0..jitter_range);
    delay + Duration::from_millis(jitter)
}

/// Stateful backoff sequence used by the retry loop.
///
/// Starts at `initial`, doubles on every [`Backoff::advance`] and never
/// exceeds `max`, jitter included.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    retry: u32,
    jitter: bool,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            retry: 1,
            jitter: false,
        }
    }

    /// Enable 0-10% jitter on the delays returned by [`Backoff::delay`].
    pub fn jittered(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// The delay to sleep before the next attempt.
    pub fn delay(&self) -> Duration {
        let delay = calculate_backoff(self.retry, self.initial, self.max);
        if self.jitter {
            with_jitter(delay).min(self.max)
        } else {
            delay
        }
    }

    /// Move to the next, doubled delay.
    pub fn advance(&mut self) {
        self.retry = self.retry.saturating_add(1);
    }
}
