//! Logging setup.

mod subscriber;

pub use subscriber::{init_tracing, LogFormat, DEFAULT_FILTER};
