//! Pipeline execution.
//!
//! This module provides:
//! - The six-step orchestrator with batch and streaming drivers
//! - Retry with backoff for per-step model calls

mod integration_tests;
mod orchestrator;
mod retry;

pub use orchestrator::{CreativePipeline, STREAM_BUFFER};
pub use retry::{with_retry, BackoffStrategy, JitterStrategy, RetryConfig};
