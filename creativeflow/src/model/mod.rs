//! The language-model service seam.
//!
//! The orchestrator talks to models only through [`ModelService`]. Batch steps
//! use [`ModelService::complete`]; streaming steps use [`ModelService::stream`]
//! and forward each fragment as it arrives.

#[cfg(feature = "openai")]
mod openai;
mod sse;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::errors::ModelError;
use crate::prompts::Prompt;

#[cfg(feature = "openai")]
pub use openai::OpenAiChatModel;
pub use sse::{sse_fragments, SseDecoder, SseItem};

/// Text fragments of one streamed completion, in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String, ModelError>>;

/// A chat-completion model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Returns the full completion for a prompt.
    async fn complete(&self, prompt: &Prompt) -> Result<String, ModelError>;

    /// Opens a streamed completion for a prompt.
    ///
    /// An error returned here means the stream never started; errors yielded
    /// by the stream mean it broke partway through.
    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream, ModelError>;
}
