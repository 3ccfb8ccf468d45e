//! The per-run accumulator of step results.

use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::PipelineRequest;
use crate::core::{StepKind, StepRecord};
use crate::errors::ContextError;

/// The output of one step.
///
/// Batch runs produce structured records; streaming runs produce the raw
/// concatenated text of the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// A parsed (or fallback) record.
    Structured(StepRecord),
    /// Raw streamed text.
    Text(String),
}

impl StepResult {
    /// Renders the result the way later prompts receive it.
    ///
    /// Records are re-serialized as compact JSON; text is passed verbatim.
    pub fn prompt_text(&self) -> Result<Cow<'_, str>, serde_json::Error> {
        match self {
            Self::Structured(record) => record.to_prompt_text().map(Cow::Owned),
            Self::Text(text) => Ok(Cow::Borrowed(text)),
        }
    }
}

impl From<StepRecord> for StepResult {
    fn from(record: StepRecord) -> Self {
        Self::Structured(record)
    }
}

/// Everything one run has produced so far.
///
/// Owned by a single run. Results are write-once: a step's result cannot be
/// replaced after it is recorded.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    request: PipelineRequest,
    results: BTreeMap<StepKind, StepResult>,
}

impl PipelineContext {
    /// Creates an empty context for a request.
    #[must_use]
    pub fn new(request: PipelineRequest) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            request,
            results: BTreeMap::new(),
        }
    }

    /// Returns the run ID used for log correlation.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns when the context was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns milliseconds elapsed since the context was created.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }

    /// Returns the original request.
    #[must_use]
    pub fn request(&self) -> &PipelineRequest {
        &self.request
    }

    /// Records a step's result.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Conflict`] if the step already has a result.
    pub fn record(&mut self, step: StepKind, result: impl Into<StepResult>) -> Result<(), ContextError> {
        if self.results.contains_key(&step) {
            return Err(ContextError::Conflict { step });
        }
        self.results.insert(step, result.into());
        Ok(())
    }

    /// Returns a step's result, if recorded.
    #[must_use]
    pub fn get(&self, step: StepKind) -> Option<&StepResult> {
        self.results.get(&step)
    }

    /// Returns a prerequisite's result on behalf of `requested_by`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Missing`] if `step` has not produced a result.
    pub fn require(&self, step: StepKind, requested_by: StepKind) -> Result<&StepResult, ContextError> {
        self.results.get(&step).ok_or(ContextError::Missing {
            missing: step,
            requested_by,
        })
    }

    /// Returns true if the step has a result.
    #[must_use]
    pub fn contains(&self, step: StepKind) -> bool {
        self.results.contains_key(&step)
    }

    /// Returns the steps recorded so far, in step order.
    #[must_use]
    pub fn completed_steps(&self) -> Vec<StepKind> {
        self.results.keys().copied().collect()
    }
}
