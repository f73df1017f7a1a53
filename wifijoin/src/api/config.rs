//! Verification timing configuration.
//!
//! Association is asynchronous on every platform: the "accepted" answer to an
//! apply call commonly arrives seconds before the radio actually reports the
//! new SSID. [`PollPolicy`] bounds how long a join waits for that to happen.

use std::time::Duration;

use crate::types::constants::verification;

/// Bounded retry policy for identity verification.
///
/// The overall attempt timeout equals [`window`](PollPolicy::window):
/// `max_attempts × interval`. There is no separate network-layer timeout.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use wifijoin::PollPolicy;
///
/// // Slow embedded access points: check once a second for thirty seconds.
/// let policy = PollPolicy::new()
///     .with_interval(Duration::from_secs(1))
///     .with_max_attempts(30);
///
/// assert_eq!(policy.window(), Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Number of identity checks before giving up.
    pub max_attempts: u32,
    /// Delay before each check.
    pub interval: Duration,
}

impl Default for PollPolicy {
    /// 20 checks, 500 ms apart: a ten second window.
    fn default() -> Self {
        Self {
            max_attempts: verification::MAX_ATTEMPTS,
            interval: verification::interval(),
        }
    }
}

impl PollPolicy {
    /// Creates the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of checks. Zero is raised to one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the delay before each check.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Total verification window.
    pub fn window(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }

    /// Keeps the interval and picks enough attempts to cover `timeout`.
    pub fn for_timeout(self, timeout: Duration) -> Self {
        let interval_ms = self.interval.as_millis().max(1);
        let attempts = timeout.as_millis().div_ceil(interval_ms);
        self.with_max_attempts(u32::try_from(attempts).unwrap_or(u32::MAX))
    }
}
