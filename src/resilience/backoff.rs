//! Exponential backoff schedule.

use std::time::Duration;

/// Delays between successive attempts: `initial`, `2 * initial`, `4 * initial`, ...
///
/// No cap and no jitter. Growth saturates at `Duration::MAX` instead of
/// overflowing.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        Self { current: initial }
    }

    /// Delay to wait before the next attempt.
    pub fn current(&self) -> Duration {
        self.current
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.current;
        self.current = delay.saturating_mul(2);
        Some(delay)
    }
}
