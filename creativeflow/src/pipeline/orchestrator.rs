//! The six-step creative pipeline.
//!
//! Steps always run in [`StepKind::ALL`] order and each reads the results of
//! its prerequisites from the run's [`PipelineContext`]. The two execution
//! modes deliberately differ in how they treat a failing step:
//!
//! - **Batch** ([`CreativePipeline::run`]) parses every reply into its step
//!   record. A step whose call, parse or step timeout fails is replaced by the
//!   record's fallback and the run continues.
//! - **Streaming** ([`CreativePipeline::stream`]) forwards model fragments as
//!   they arrive and passes each step's raw text on to later steps. The first
//!   failure ends the stream with a single error event.

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

use super::with_retry;
use crate::config::PipelineConfig;
use crate::context::{PipelineContext, PipelineRequest, StepResult};
use crate::core::{
    parse_step_response, AudienceAnalysis, CreativeIdeas, CreativeResult, ExecutionMode,
    ExecutiveReport, GeneratedContent, MarketingSuggestions, ProductAnalysis, StepKind, StepRecord,
    StepSchema, StreamEvent,
};
use crate::errors::{CreativeflowError, StepFailure, ValidationError};
use crate::events::{event_types, EventSink, LoggingEventSink};
use crate::model::ModelService;
use crate::prompts::{bind_step, Prompt, PromptSet};

/// Capacity of the channel between a streaming run and its consumer.
pub const STREAM_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    step: Option<StepKind>,
    seconds: f64,
}

impl Deadline {
    /// Returns `None` when `limit` lies beyond what an `Instant` can hold,
    /// which is the same as no deadline.
    fn after(limit: std::time::Duration, step: Option<StepKind>) -> Option<Self> {
        Instant::now().checked_add(limit).map(|at| Self {
            at,
            step,
            seconds: limit.as_secs_f64(),
        })
    }

    fn error(&self) -> CreativeflowError {
        match self.step {
            Some(step) => CreativeflowError::step_timeout(step, self.seconds),
            None => CreativeflowError::run_timeout(self.seconds),
        }
    }

    fn earliest(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if a.at <= b.at { a } else { b }),
            (a, b) => a.or(b),
        }
    }
}

/// A fatal streaming failure and the step it happened in.
struct StreamFailure {
    step: Option<StepKind>,
    error: CreativeflowError,
}

impl StreamFailure {
    fn in_step(step: StepKind) -> impl FnOnce(CreativeflowError) -> Self {
        move |error| Self {
            step: Some(step),
            error,
        }
    }
}

/// Orchestrates the six steps against a [`ModelService`].
///
/// Cheap to clone; clones share the model, prompts and configuration.
#[derive(Clone)]
pub struct CreativePipeline {
    model: Arc<dyn ModelService>,
    prompts: Arc<PromptSet>,
    config: Arc<PipelineConfig>,
    events: Arc<dyn EventSink>,
}

impl CreativePipeline {
    /// Creates a pipeline with the default prompts and a logging event sink.
    #[must_use]
    pub fn new(model: Arc<dyn ModelService>, config: PipelineConfig) -> Self {
        Self {
            model,
            prompts: Arc::new(PromptSet::default()),
            config: Arc::new(config),
            events: Arc::new(LoggingEventSink::default()),
        }
    }

    /// Creates a pipeline backed by [`OpenAiChatModel`](crate::model::OpenAiChatModel).
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    #[cfg(feature = "openai")]
    pub fn from_config(config: PipelineConfig) -> Result<Self, CreativeflowError> {
        let model = crate::model::OpenAiChatModel::new(config.model.clone())?;
        Ok(Self::new(Arc::new(model), config))
    }

    /// Replaces the prompt templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    /// Replaces the lifecycle event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs all steps in batch mode and returns the aggregated result.
    ///
    /// Steps 1–5 always run; step 6 runs only when `include_executive_report`
    /// is set.
    ///
    /// # Errors
    ///
    /// Fails on an invalid request (before any model call), on a prompt that
    /// cannot be bound, or when the run timeout expires. Step failures never
    /// fail the run.
    pub async fn run(
        &self,
        request: PipelineRequest,
        include_executive_report: bool,
    ) -> Result<CreativeResult, CreativeflowError> {
        request.validate()?;
        let mut ctx = PipelineContext::new(request);
        let span = tracing::info_span!(
            "pipeline",
            run_id = %ctx.run_id(),
            mode = %ExecutionMode::Batch
        );

        async {
            self.started(&ctx, ExecutionMode::Batch).await;

            let steps = self.batch_steps(&mut ctx, include_executive_report);
            let outcome = match self.config.timeouts.run_timeout() {
                Some(limit) => tokio::time::timeout(limit, steps)
                    .await
                    .unwrap_or_else(|_| Err(CreativeflowError::run_timeout(limit.as_secs_f64()))),
                None => steps.await,
            };

            match &outcome {
                Ok(_) => self.completed(&ctx).await,
                Err(e) => self.failed(&ctx, None, e).await,
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn batch_steps(
        &self,
        ctx: &mut PipelineContext,
        include_executive_report: bool,
    ) -> Result<CreativeResult, CreativeflowError> {
        self.batch_step::<ProductAnalysis>(ctx).await?;
        self.batch_step::<AudienceAnalysis>(ctx).await?;
        self.batch_step::<CreativeIdeas>(ctx).await?;
        let content = self.batch_step::<GeneratedContent>(ctx).await?;
        let suggestions = self.batch_step::<MarketingSuggestions>(ctx).await?;
        let report = if include_executive_report {
            Some(self.batch_step::<ExecutiveReport>(ctx).await?)
        } else {
            None
        };

        Ok(CreativeResult::assemble(
            ctx.request().client_name.clone(),
            &content,
            &suggestions,
            report,
        ))
    }

    async fn batch_step<T: StepSchema>(&self, ctx: &mut PipelineContext) -> Result<T, CreativeflowError> {
        let step = T::STEP;
        let prompt = bind_step(&self.prompts, step, ExecutionMode::Batch, ctx)?;

        let attempts = with_retry(&self.config.retry, step.name(), || {
            self.complete_and_parse::<T>(&prompt)
        });
        let outcome = match self.config.timeouts.step_timeout() {
            Some(limit) => tokio::time::timeout(limit, attempts)
                .await
                .unwrap_or_else(|_| Err(StepFailure::Timeout(limit.as_secs_f64()))),
            None => attempts.await,
        };

        let record = match outcome {
            Ok(record) => {
                info!(step = step.name(), "Step completed");
                self.events
                    .emit(
                        event_types::STEP_COMPLETED,
                        Some(json!({
                            "run_id": ctx.run_id().to_string(),
                            "step": step.index(),
                            "name": step.name(),
                        })),
                    )
                    .await;
                record
            }
            Err(failure) => {
                warn!(step = step.name(), error = %failure, "Step failed, using fallback");
                self.events
                    .emit(
                        event_types::STEP_FALLBACK,
                        Some(json!({
                            "run_id": ctx.run_id().to_string(),
                            "step": step.index(),
                            "name": step.name(),
                            "reason": failure.to_string(),
                        })),
                    )
                    .await;
                T::fallback(ctx.request())
            }
        };

        let stored: StepRecord = record.clone().into();
        ctx.record(step, stored)?;
        Ok(record)
    }

    async fn complete_and_parse<T: StepSchema>(&self, prompt: &Prompt) -> Result<T, StepFailure> {
        let raw = self.model.complete(prompt).await?;
        Ok(parse_step_response::<T>(&raw)?)
    }

    /// Starts a streaming run on a background task and returns its events.
    ///
    /// The request is validated first, so an invalid request is rejected
    /// without starting anything. Dropping the returned stream cancels the
    /// run. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the validation error for an invalid request.
    pub fn stream(&self, request: PipelineRequest) -> Result<BoxStream<'static, StreamEvent>, ValidationError> {
        request.validate()?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let pipeline = self.clone();
        let supervisor = tx.clone();
        let run = tokio::spawn(async move {
            // The outcome is already reported through the channel and the logs.
            let _ = pipeline.run_streaming(request, tx).await;
        });
        tokio::spawn(async move {
            if let Err(err) = run.await {
                if err.is_panic() {
                    error!("Streaming run panicked");
                    let _ = supervisor
                        .send(StreamEvent::error(None, "Pipeline run aborted unexpectedly"))
                        .await;
                }
            }
        });

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
        .boxed())
    }

    /// Runs all six steps in streaming mode, sending events to `tx`.
    ///
    /// Every run that gets past validation ends with exactly one terminal
    /// event: `complete` carrying step 6's text, or `error`. An invalid
    /// request produces a single `error` event with no step. Returns step 6's
    /// text.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the run. [`CreativeflowError::Cancelled`]
    /// means the receiver was dropped; no terminal event is sent then.
    pub async fn run_streaming(
        &self,
        request: PipelineRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<String, CreativeflowError> {
        if let Err(e) = request.validate() {
            let _ = tx.send(StreamEvent::error(None, e.to_string())).await;
            return Err(e.into());
        }

        let mut ctx = PipelineContext::new(request);
        let span = tracing::info_span!(
            "pipeline",
            run_id = %ctx.run_id(),
            mode = %ExecutionMode::Streaming
        );

        async {
            self.started(&ctx, ExecutionMode::Streaming).await;

            match self.stream_steps(&mut ctx, &tx).await {
                Ok(final_content) => {
                    send(&tx, StreamEvent::complete(final_content.clone())).await?;
                    self.completed(&ctx).await;
                    Ok(final_content)
                }
                Err(StreamFailure {
                    error: error @ CreativeflowError::Cancelled(_),
                    ..
                }) => {
                    info!(completed = ctx.completed_steps().len(), "Stream receiver dropped, stopping run");
                    Err(error)
                }
                Err(StreamFailure { step, error }) => {
                    self.failed(&ctx, step, &error).await;
                    let _ = tx.send(StreamEvent::error(step, error.to_string())).await;
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn stream_steps(
        &self,
        ctx: &mut PipelineContext,
        tx: &mpsc::Sender<StreamEvent>,
    ) -> Result<String, StreamFailure> {
        let run_deadline = self
            .config
            .timeouts
            .run_timeout()
            .and_then(|limit| Deadline::after(limit, None));

        let mut last = String::new();
        for step in StepKind::ALL {
            last = self
                .stream_step(step, ctx, tx, run_deadline)
                .await
                .map_err(StreamFailure::in_step(step))?;
        }
        Ok(last)
    }

    async fn stream_step(
        &self,
        step: StepKind,
        ctx: &mut PipelineContext,
        tx: &mpsc::Sender<StreamEvent>,
        run_deadline: Option<Deadline>,
    ) -> Result<String, CreativeflowError> {
        let prompt = bind_step(&self.prompts, step, ExecutionMode::Streaming, ctx)?;
        send(tx, StreamEvent::step_start(step)).await?;

        let step_deadline = self
            .config
            .timeouts
            .step_timeout()
            .and_then(|limit| Deadline::after(limit, Some(step)));
        let deadline = Deadline::earliest(step_deadline, run_deadline);

        let mut fragments = watch(tx, deadline, self.model.stream(&prompt)).await??;
        let mut text = String::new();
        while let Some(fragment) = watch(tx, deadline, fragments.next()).await? {
            let fragment = fragment?;
            debug!(step = step.name(), len = fragment.len(), "Fragment received");
            text.push_str(&fragment);
            send(tx, StreamEvent::step_stream(step, fragment)).await?;
        }

        ctx.record(step, StepResult::Text(text.clone()))?;
        send(tx, StreamEvent::step_complete(step, text.clone())).await?;

        info!(step = step.name(), chars = text.chars().count(), "Step completed");
        self.events
            .emit(
                event_types::STEP_COMPLETED,
                Some(json!({
                    "run_id": ctx.run_id().to_string(),
                    "step": step.index(),
                    "name": step.name(),
                })),
            )
            .await;
        Ok(text)
    }

    async fn started(&self, ctx: &PipelineContext, mode: ExecutionMode) {
        info!(client_name = %ctx.request().client_name, "Pipeline started");
        self.events
            .emit(
                event_types::PIPELINE_STARTED,
                Some(json!({
                    "run_id": ctx.run_id().to_string(),
                    "mode": mode.to_string(),
                    "client_name": ctx.request().client_name,
                    "started_at": ctx.started_at().to_rfc3339(),
                })),
            )
            .await;
    }

    async fn completed(&self, ctx: &PipelineContext) {
        let duration_ms = ctx.elapsed_ms();
        info!(steps = ctx.completed_steps().len(), duration_ms, "Pipeline completed");
        self.events
            .emit(
                event_types::PIPELINE_COMPLETED,
                Some(json!({
                    "run_id": ctx.run_id().to_string(),
                    "steps": ctx.completed_steps().len(),
                    "duration_ms": duration_ms,
                })),
            )
            .await;
    }

    async fn failed(&self, ctx: &PipelineContext, step: Option<StepKind>, err: &CreativeflowError) {
        let duration_ms = ctx.elapsed_ms();
        error!(step = step.map(StepKind::name), error = %err, duration_ms, "Pipeline failed");
        self.events
            .emit(
                event_types::PIPELINE_FAILED,
                Some(json!({
                    "run_id": ctx.run_id().to_string(),
                    "step": step.map(StepKind::index),
                    "error": err.to_string(),
                    "duration_ms": duration_ms,
                })),
            )
            .await;
    }
}

async fn send(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<(), CreativeflowError> {
    tx.send(event)
        .await
        .map_err(|_| CreativeflowError::Cancelled("stream receiver dropped".to_string()))
}

/// Awaits `fut` unless the deadline passes or the receiver goes away first.
async fn watch<F: Future>(
    tx: &mpsc::Sender<StreamEvent>,
    deadline: Option<Deadline>,
    fut: F,
) -> Result<F::Output, CreativeflowError> {
    let timed = async {
        match deadline {
            Some(d) => tokio::time::timeout_at(d.at, fut).await.map_err(|_| d.error()),
            None => Ok(fut.await),
        }
    };

    tokio::select! {
        biased;
        () = tx.closed() => Err(CreativeflowError::Cancelled("stream receiver dropped".to_string())),
        out = timed => out,
    }
}
