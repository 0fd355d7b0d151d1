//! Configuration for the reporting pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Tunables for the state-change reporting pipeline.
///
/// Every behavior knob lives here so tests can substitute values; the
/// defaults are the production ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Ceiling on concurrent in-flight submissions across all tasks.
    pub max_concurrent: usize,
    /// First backoff delay after a failed submission.
    pub backoff_min_ms: u64,
    /// Backoff ceiling.
    pub backoff_max_ms: u64,
    /// Growth factor applied after each consecutive failure.
    pub backoff_multiplier: f64,
    /// How often orphaned container/managed-agent batches are flushed.
    pub drain_interval_ms: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            backoff_min_ms: 1_000,
            backoff_max_ms: 30_000,
            backoff_multiplier: 1.3,
            drain_interval_ms: 60_000,
        }
    }
}

impl ReporterConfig {
    pub fn backoff_min(&self) -> Duration {
        Duration::from_millis(self.backoff_min_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrent".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.backoff_min_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "backoff_min_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.backoff_max_ms < self.backoff_min_ms {
            return Err(ConfigError::Invalid {
                field: "backoff_max_ms".into(),
                reason: "must be >= backoff_min_ms".into(),
            });
        }
        if self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                field: "backoff_multiplier".into(),
                reason: "must be >= 1.0".into(),
            });
        }
        Ok(())
    }
}
