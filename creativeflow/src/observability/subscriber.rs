//! Global `tracing` subscriber setup.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::errors::CreativeflowError;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = CreativeflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(CreativeflowError::Config(format!("unknown log format '{other}'"))),
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// `RUST_LOG` controls the filter. Call once at startup.
///
/// # Errors
///
/// Returns [`CreativeflowError::Config`] if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<(), CreativeflowError> {
    let registry = tracing_subscriber::registry().with(env_filter());
    let result = match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
    };
    result.map_err(|e| CreativeflowError::Config(format!("tracing already initialised: {e}")))
}
