//! Bounded retry with exponential backoff.

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use std::time::Duration;
use tracing::warn;

/// Failure of a single remote attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Timeout, connection failure, rate limiting or server error. Retried.
    Transient(String),
    /// Request refused or response unusable. Not retried.
    Rejected(String),
}

/// Retry budget for one remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Ceiling for the delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Build from remote backend settings.
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, is rejected, or the budget is spent.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T>(
        &self,
        mut op: impl FnMut(u32) -> std::result::Result<T, TransportError>,
    ) -> Result<T> {
        let mut last_reason = String::new();

        for attempt in 1..=self.max_attempts {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(TransportError::Rejected(reason)) => {
                    return Err(Error::BackendRejected { reason });
                }
                Err(TransportError::Transient(reason)) => {
                    if attempt < self.max_attempts {
                        let delay = self.delay_after(attempt);
                        warn!(
                            "Attempt {attempt}/{} failed ({reason}), retrying in {}ms",
                            self.max_attempts,
                            delay.as_millis()
                        );
                        std::thread::sleep(delay);
                    } else {
                        warn!("Attempt {attempt}/{} failed ({reason})", self.max_attempts);
                    }
                    last_reason = reason;
                }
            }
        }

        Err(Error::BackendUnavailable {
            attempts: self.max_attempts,
            reason: last_reason,
        })
    }
}
