//! Exponential backoff for failed submissions.

use std::time::Duration;

/// Per-pipeline retry delay policy.
///
/// One instance lives inside each per-task submission worker; delays grow
/// across consecutive failures and reset on the next success.
pub trait Backoff: Send {
    /// Delay to sleep before the next attempt. Consecutive calls grow the
    /// delay up to the ceiling.
    fn next_delay(&mut self) -> Duration;

    /// Return to the initial delay after a successful attempt.
    fn reset(&mut self);
}

/// Exponential backoff with a ceiling.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current: Duration,
}

impl ExponentialBackoff {
    /// # Panics
    /// Panics if `max < initial` or `multiplier < 1.0`; these are
    /// programming errors. The reporter constructors reject such values
    /// through `ReporterConfig::validate` before any backoff is built.
    pub fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        assert!(max >= initial, "max backoff must be >= initial backoff");
        assert!(multiplier >= 1.0, "backoff multiplier must be >= 1.0");
        Self {
            initial,
            max,
            multiplier,
            current: initial,
        }
    }
}

impl Backoff for ExponentialBackoff {
    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(self.multiplier).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}
