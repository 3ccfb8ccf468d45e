//! Request and per-run context.
//!
//! This module provides:
//! - The validated pipeline request
//! - The write-once accumulator of step results for a single run

mod pipeline_context;
mod request;

pub use pipeline_context::{PipelineContext, StepResult};
pub use request::{
    PipelineRequest, CLIENT_NAME_CHARS, PRODUCT_DESCRIPTION_CHARS, TARGET_AUDIENCE_CHARS,
    TONE_ENTRIES,
};
