//! Backoff policy and manager-independent retry/timeout helpers.
//!
//! The delay for attempt `n` (0-indexed) is `initial_delay × backoff_multiplier^n`,
//! clamped to `max_delay`.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use prometheus_task_scheduler::core::{retry_on_failure, RetryPolicy};
//!
//! let policy = RetryPolicy::new()
//!     .with_max_retries(2)
//!     .with_initial_delay(Duration::from_millis(50));
//! let body = retry_on_failure(&policy, || fetch_page()).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::SchedulerError;

/// Retry budget and backoff shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplicative growth per failed attempt.
    pub backoff_multiplier: f64,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Three retries, 1s initial delay, doubling, capped at 5 minutes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the growth factor.
    #[must_use]
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the delay cap.
    #[must_use]
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to sleep after failed attempt `attempt` (0-indexed).
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let max_secs = self.max_delay.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Validate the policy.
    ///
    /// # Errors
    ///
    /// Returns an error string if the multiplier is not a finite value `>= 1.0`.
    pub fn validate(&self) -> Result<(), String> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be finite and >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        Ok(())
    }
}

/// Run a fresh future from `factory` until it succeeds or the budget is spent.
///
/// # Errors
///
/// Returns the last attempt's error once `policy.max_retries` retries have failed.
pub async fn retry_on_failure<R, F, Fut>(policy: &RetryPolicy, mut factory: F) -> anyhow::Result<R>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
{
    let mut attempt = 0;
    loop {
        match factory().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Bound a future by `limit`.
///
/// # Errors
///
/// Returns [`SchedulerError::TaskTimeout`] if `limit` elapses first, otherwise
/// whatever the future returns.
pub async fn with_timeout<R, Fut>(limit: Duration, fut: Fut) -> anyhow::Result<R>
where
    Fut: Future<Output = anyhow::Result<R>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| anyhow::Error::new(SchedulerError::TaskTimeout(limit)))?
}
