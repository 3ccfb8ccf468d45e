//! Pipeline configuration.
//!
//! Configuration is immutable once a pipeline is built. It can be deserialized
//! (every field has a default) or read from the process environment with
//! [`PipelineConfig::from_env`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::CreativeflowError;
pub use crate::pipeline::{BackoffStrategy, JitterStrategy, RetryConfig};

/// Settings for the OpenAI-compatible chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Base URL of the API, without a trailing `/chat/completions`.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bearer token. Requests fail with `NotConfigured` when absent.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4.1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            api_base: default_api_base(),
            api_key: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl ModelConfig {
    /// Creates a model config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Returns the chat completions endpoint.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Time budgets for a run. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Budget for one step, including retries.
    #[serde(default)]
    pub step_timeout_secs: Option<f64>,
    /// Budget for the whole run.
    #[serde(default)]
    pub run_timeout_secs: Option<f64>,
}

impl TimeoutConfig {
    /// Sets the per-step budget.
    #[must_use]
    pub fn with_step_timeout(mut self, seconds: f64) -> Self {
        self.step_timeout_secs = Some(seconds);
        self
    }

    /// Sets the whole-run budget.
    #[must_use]
    pub fn with_run_timeout(mut self, seconds: f64) -> Self {
        self.run_timeout_secs = Some(seconds);
        self
    }

    /// Returns the per-step budget as a duration.
    #[must_use]
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.and_then(|s| Duration::try_from_secs_f64(s).ok())
    }

    /// Returns the whole-run budget as a duration.
    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.and_then(|s| Duration::try_from_secs_f64(s).ok())
    }
}

/// Everything a [`CreativePipeline`](crate::pipeline::CreativePipeline) is configured with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,
    /// Time budgets.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Per-step retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl PipelineConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model settings.
    #[must_use]
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    /// Sets the time budgets.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`CreativeflowError::Config`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, CreativeflowError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Unset and empty variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CreativeflowError::Config`] if a numeric variable does not parse
    /// or a timeout is not a positive number of seconds.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CreativeflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut model = ModelConfig::default();
        if let Some(key) = var("OPENAI_API_KEY") {
            model.api_key = Some(key);
        }
        if let Some(name) = var("OPENAI_MODEL") {
            model.model = name;
        }
        if let Some(base) = var("OPENAI_API_BASE") {
            model.api_base = base;
        }
        if let Some(t) = parse_var::<f32>("TEMPERATURE", var("TEMPERATURE"))? {
            model.temperature = t;
        }

        let timeouts = TimeoutConfig {
            step_timeout_secs: parse_timeout("STEP_TIMEOUT_SECS", var("STEP_TIMEOUT_SECS"))?,
            run_timeout_secs: parse_timeout("RUN_TIMEOUT_SECS", var("RUN_TIMEOUT_SECS"))?,
        };

        let mut retry = RetryConfig::default();
        if let Some(n) = parse_var::<usize>("STEP_MAX_ATTEMPTS", var("STEP_MAX_ATTEMPTS"))? {
            retry.max_attempts = n;
        }

        Ok(Self {
            model,
            timeouts,
            retry,
        })
    }
}

fn parse_var<T>(key: &str, value: Option<String>) -> Result<Option<T>, CreativeflowError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| CreativeflowError::Config(format!("{key}={v:?}: {e}")))
        })
        .transpose()
}

fn parse_timeout(key: &str, value: Option<String>) -> Result<Option<f64>, CreativeflowError> {
    match parse_var::<f64>(key, value)? {
        Some(s) if s.is_finite() && s > 0.0 => Ok(Some(s)),
        Some(s) => Err(CreativeflowError::Config(format!(
            "{key}={s}: must be a positive number of seconds"
        ))),
        None => Ok(None),
    }
}
