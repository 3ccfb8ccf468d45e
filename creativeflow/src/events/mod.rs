//! Lifecycle events for observability.
//!
//! A pipeline reports its progress to an injected [`EventSink`]. These events
//! are separate from the [`StreamEvent`](crate::core::StreamEvent)s a
//! streaming caller receives: they are for operators, not for end users.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Names of the events a pipeline emits.
pub mod event_types {
    /// A run passed validation and is about to execute step 1.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// A step produced its result from the model.
    pub const STEP_COMPLETED: &str = "step.completed";
    /// A batch step failed and its fallback record was used.
    pub const STEP_FALLBACK: &str = "step.fallback";
    /// A run finished successfully.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A run ended with a fatal error.
    pub const PIPELINE_FAILED: &str = "pipeline.failed";
}
