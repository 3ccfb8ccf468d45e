//! HTTP surface for the creativeflow pipeline.
//!
//! Routes:
//! - `GET /health`
//! - `POST /api/generate-creative-content-stream`: server-sent events, one
//!   JSON [`StreamEvent`](creativeflow::core::StreamEvent) per frame
//! - `POST /api/generate-creative-content`: batch run returning
//!   [`CreativeResult`] as JSON

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderName, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use creativeflow::context::PipelineRequest;
use creativeflow::core::CreativeResult;
use creativeflow::errors::CreativeflowError;
use creativeflow::pipeline::CreativePipeline;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pipeline: CreativePipeline,
}

impl AppState {
    /// Wraps a pipeline for the handlers.
    #[must_use]
    pub fn new(pipeline: CreativePipeline) -> Self {
        Self { pipeline }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// What went wrong.
    pub detail: String,
    /// The HTTP status, repeated in the body.
    pub status_code: u16,
}

/// A handler failure, rendered as [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// Returns the response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CreativeflowError> for ApiError {
    fn from(err: CreativeflowError) -> Self {
        let status = if err.is_validation() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            detail: self.detail,
            status_code: self.status.as_u16(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Body of the batch endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    /// The pipeline inputs.
    #[serde(flatten)]
    pub request: PipelineRequest,
    /// Whether to run step 6.
    #[serde(default)]
    pub include_executive_report: bool,
}

/// Builds the application router.
#[must_use]
pub fn router(pipeline: CreativePipeline) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate-creative-content-stream", post(generate_stream))
        .route("/api/generate-creative-content", post(generate))
        .with_state(AppState::new(pipeline))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

/// `POST /api/generate-creative-content-stream`
pub async fn generate_stream(
    State(state): State<AppState>,
    body: Result<Json<PipelineRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    tracing::info!(client_name = %request.client_name, "Streaming request received");

    let events = state
        .pipeline
        .stream(request)
        .map_err(CreativeflowError::from)?
        .map(|event| Event::default().json_data(event));

    let headers = [(header::CACHE_CONTROL, "no-cache"), (X_ACCEL_BUFFERING, "no")];
    Ok((headers, Sse::new(events).keep_alive(KeepAlive::default())).into_response())
}

/// `POST /api/generate-creative-content`
pub async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<CreativeResult>, ApiError> {
    let Json(body) = body?;
    tracing::info!(
        client_name = %body.request.client_name,
        include_executive_report = body.include_executive_report,
        "Batch request received"
    );

    let result = state
        .pipeline
        .run(body.request, body.include_executive_report)
        .await?;
    Ok(Json(result))
}

/// Listener settings read from `API_HOST` and `API_PORT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Reads the listener settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`CreativeflowError::Config`] when `API_PORT` is not a port.
    pub fn from_env() -> Result<Self, CreativeflowError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the listener settings from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CreativeflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup("API_HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host;
        }
        if let Some(port) = lookup("API_PORT").filter(|p| !p.trim().is_empty()) {
            config.port = port
                .trim()
                .parse()
                .map_err(|e| CreativeflowError::Config(format!("API_PORT={port:?}: {e}")))?;
        }
        Ok(config)
    }

    /// Returns the `host:port` address to bind.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use creativeflow::config::PipelineConfig;
    use creativeflow::core::StreamEvent;
    use creativeflow::testing::{lumen_request, Script, ScriptedModel};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn state(model: ScriptedModel) -> State<AppState> {
        State(AppState::new(CreativePipeline::new(
            Arc::new(model),
            PipelineConfig::default(),
        )))
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn test_stream_sends_sse_frames() {
        let response = generate_stream(state(ScriptedModel::new()), Ok(Json(lumen_request())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers["x-accel-buffering"], "no");

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let events: Vec<StreamEvent> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .map(|data| serde_json::from_str(data).unwrap())
            .collect();

        assert_eq!(events.first().map(StreamEvent::kind), Some("step_start"));
        assert_eq!(events.last().map(StreamEvent::kind), Some("complete"));
    }

    #[tokio::test]
    async fn test_stream_rejects_invalid_request_with_422() {
        let mut request = lumen_request();
        request.tone_of_voice = vec!["calm".to_string(); 11];

        let err = generate_stream(state(ScriptedModel::new()), Ok(Json(request)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: ErrorResponse = body_json(err.into_response()).await;
        assert_eq!(body.status_code, 422);
        assert!(body.detail.contains("tone_of_voice"));
    }

    #[tokio::test]
    async fn test_batch_returns_result() {
        let body = GenerateRequest {
            request: lumen_request(),
            include_executive_report: true,
        };
        let Json(result) = generate(state(ScriptedModel::new()), Ok(Json(body)))
            .await
            .unwrap();

        assert_eq!(result.client_name, "Lumen");
        assert!(result.executive_report.is_some());
    }

    #[tokio::test]
    async fn test_batch_step_failure_still_succeeds() {
        let model = ScriptedModel::new().with_script("marketing_suggestions", Script::fail("down"));
        let body = GenerateRequest {
            request: lumen_request(),
            include_executive_report: false,
        };
        let Json(result) = generate(state(model), Ok(Json(body))).await.unwrap();
        assert_eq!(result.marketing_suggestions.len(), 3);
        assert_eq!(
            result.marketing_suggestions[0],
            "Post engaging content daily (Social media)"
        );
        assert!(result.executive_report.is_none());
    }

    #[test]
    fn test_generate_request_flattens_fields() {
        let body: GenerateRequest = serde_json::from_value(json!({
            "client_name": "Lumen",
            "product_description": "a 200ml natural juice with no added sugar",
            "target_audience": "health-conscious young adults aged 20-35",
            "tone_of_voice": ["friendly", "modern"]
        }))
        .unwrap();
        assert_eq!(body.request, lumen_request());
        assert!(!body.include_executive_report);
    }

    #[test]
    fn test_server_config() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:8000");

        let config = ServerConfig::from_lookup(|key| match key {
            "API_HOST" => Some("127.0.0.1".to_string()),
            "API_PORT" => Some("9090".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.addr(), "127.0.0.1:9090");

        assert!(ServerConfig::from_lookup(|_| Some("http".to_string())).is_err());
    }
}
