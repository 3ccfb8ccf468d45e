//! Core domain model types for creativeflow.
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - The six steps and their ordering
//! - Structured step records with their fallbacks
//! - Response parsing
//! - Stream events and the aggregated batch result

mod event;
mod parse;
mod records;
mod result;
mod step;

pub use event::StreamEvent;
pub use parse::parse_step_response;
pub use records::{
    AudienceAnalysis, CreativeIdea, CreativeIdeas, ExecutiveReport, GeneratedContent,
    MarketingSuggestion, MarketingSuggestions, ProductAnalysis, RoadmapPhase, StepRecord,
    StepSchema,
};
pub use result::CreativeResult;
pub use step::{ExecutionMode, StepKind};
