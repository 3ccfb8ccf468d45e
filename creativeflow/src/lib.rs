//! # Creativeflow
//!
//! A six-step creative content pipeline driven by a large language model.
//!
//! Given a client, a product, an audience and a tone of voice, the pipeline
//! runs product analysis, audience analysis, creative ideation, content
//! generation, marketing suggestions and a final synthesis, each step reading
//! the results of the steps before it.
//!
//! Two execution modes are provided:
//!
//! - **Batch**: every step's reply is parsed into a typed record. A step that
//!   fails is replaced by a deterministic fallback and the run continues.
//! - **Streaming**: model fragments are forwarded as [`StreamEvent`]s as they
//!   arrive. The first failure ends the stream with an error event.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use creativeflow::prelude::*;
//!
//! let config = PipelineConfig::from_env()?;
//! let pipeline = CreativePipeline::from_config(config)?;
//!
//! let request = PipelineRequest::new(
//!     "Lumen",
//!     "a 200ml natural juice with no added sugar",
//!     "health-conscious young adults aged 20-35",
//!     vec!["friendly".into(), "modern".into()],
//! );
//!
//! // Batch
//! let result = pipeline.run(request.clone(), true).await?;
//!
//! // Streaming
//! let mut events = pipeline.stream(request)?;
//! while let Some(event) = events.next().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! ```
//!
//! [`StreamEvent`]: core::StreamEvent

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod model;
pub mod observability;
pub mod pipeline;
pub mod prompts;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ModelConfig, PipelineConfig, RetryConfig, TimeoutConfig};
    pub use crate::context::{PipelineContext, PipelineRequest, StepResult};
    pub use crate::core::{
        CreativeResult, ExecutionMode, ExecutiveReport, StepKind, StepRecord, StreamEvent,
    };
    pub use crate::errors::{CreativeflowError, ModelError, ValidationError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    #[cfg(feature = "openai")]
    pub use crate::model::OpenAiChatModel;
    pub use crate::model::{FragmentStream, ModelService};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::CreativePipeline;
    pub use crate::prompts::{Prompt, PromptSet, PromptTemplate};
    pub use futures::StreamExt;
}
