//! OpenAI-compatible chat completions client.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{sse_fragments, FragmentStream, ModelService};
use crate::config::ModelConfig;
use crate::errors::ModelError;
use crate::prompts::Prompt;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
}

/// A [`ModelService`] backed by a `/chat/completions` endpoint.
///
/// Each prompt is sent as a single user message.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: reqwest::Client,
    config: ModelConfig,
}

impl OpenAiChatModel {
    /// Creates a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ModelError::transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Returns the model configuration.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    async fn send(&self, prompt: &Prompt, stream: bool) -> Result<reqwest::Response, ModelError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ModelError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?;

        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: [ChatMessage {
                role: "user",
                content: &prompt.text,
            }],
            stream,
        };

        tracing::debug!(
            template = %prompt.template,
            model = %self.config.model,
            stream,
            "Sending chat completion request"
        );

        let res = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res)
    }
}

#[async_trait]
impl ModelService for OpenAiChatModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String, ModelError> {
        let res = self.send(prompt, false).await?;
        let response: ChatResponse = res
            .json()
            .await
            .map_err(|e| ModelError::malformed(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::malformed("response has no message content"))
    }

    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream, ModelError> {
        let res = self.send(prompt, true).await?;
        let body = res
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ModelError::transport(e.to_string())));
        Ok(sse_fragments(body))
    }
}
