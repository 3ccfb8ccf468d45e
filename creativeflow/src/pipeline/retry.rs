//! Retry helper for per-step model calls.
//!
//! A step's model call (including parsing its response) may be attempted more
//! than once before the batch driver falls back. The default is a single
//! attempt.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^retry
    #[default]
    Exponential,
    /// delay = base
    Constant,
}

/// Jitter applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    None,
    /// Random from 0 to delay
    #[default]
    Full,
}

fn default_max_attempts() -> usize {
    1
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    10_000
}

/// Configuration for step retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per step, including the first. Zero is treated as one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Base delay between attempts in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter_strategy: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_strategy: BackoffStrategy::default(),
            jitter_strategy: JitterStrategy::default(),
        }
    }
}

impl RetryConfig {
    /// Creates a single-attempt retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }

    fn attempts(&self) -> usize {
        self.max_attempts.max(1)
    }

    /// Returns the delay before retry number `retry` (0-based).
    #[must_use]
    pub fn delay_for(&self, retry: usize) -> Duration {
        let base = self.base_delay_ms;
        let delay = match self.backoff_strategy {
            BackoffStrategy::Exponential => {
                let exp = u32::try_from(retry).unwrap_or(u32::MAX);
                base.saturating_mul(2u64.saturating_pow(exp))
            }
            BackoffStrategy::Constant => base,
        }
        .min(self.max_delay_ms);

        let jittered = match self.jitter_strategy {
            JitterStrategy::None => delay,
            JitterStrategy::Full if delay == 0 => 0,
            JitterStrategy::Full => rand::thread_rng().gen_range(0..=delay),
        };

        Duration::from_millis(jittered)
    }
}

/// Runs `operation` until it succeeds or the attempts are used up.
///
/// Returns the last error when every attempt fails.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, key: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = config.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                let delay = config.delay_for(attempt - 1);
                tracing::debug!(
                    key,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Retrying after error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
