//! Error types for the creativeflow pipeline.
//!
//! Step-level failures ([`ModelError`], [`StepParseError`]) are recoverable in
//! batch mode through per-step fallbacks. Everything that reaches the caller as
//! a [`CreativeflowError`] is run-fatal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::core::StepKind;

/// The main error type for creativeflow operations.
#[derive(Debug, Error)]
pub enum CreativeflowError {
    /// The request failed validation before any model call.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Assembling the step context failed.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// A prompt could not be bound.
    #[error("{0}")]
    Prompt(#[from] PromptError),

    /// A model call failed outside of a fallback scope.
    #[error("{0}")]
    Model(#[from] ModelError),

    /// A step or run exceeded its time budget.
    #[error("Timed out after {seconds}s ({scope})")]
    Timeout {
        /// What timed out ("run" or a step name).
        scope: String,
        /// The configured bound in seconds.
        seconds: f64,
    },

    /// The consumer stopped listening.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CreativeflowError {
    /// Creates a run-level timeout error.
    #[must_use]
    pub fn run_timeout(seconds: f64) -> Self {
        Self::Timeout {
            scope: "run".to_string(),
            seconds,
        }
    }

    /// Creates a step-level timeout error.
    #[must_use]
    pub fn step_timeout(step: StepKind, seconds: f64) -> Self {
        Self::Timeout {
            scope: step.name().to_string(),
            seconds,
        }
    }

    /// Returns true for errors caused by the request rather than the run.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for CreativeflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A single violated request constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// The offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// Error raised when a request violates its field bounds.
#[derive(Debug, Clone, Error)]
#[error("Invalid request: {}", summarize(.violations))]
pub struct ValidationError {
    /// Every violated constraint, in field order.
    pub violations: Vec<FieldViolation>,
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Creates a validation error from a list of violations.
    #[must_use]
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// Creates a validation error for a single field.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation {
                field: field.into(),
                message: message.into(),
            }],
        }
    }

    /// Returns true if the given field is among the violations.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map.insert("violations".to_string(), serde_json::json!(self.violations));
        map
    }
}

/// Errors raised while reading or writing the per-run context.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    /// A step result was written twice.
    #[error("Result for step {step} already recorded")]
    Conflict {
        /// The step whose result already exists.
        step: StepKind,
    },

    /// A step read a prerequisite that was never produced.
    #[error("Step {requested_by} requires the result of step {missing}, which is not available")]
    Missing {
        /// The missing prerequisite.
        missing: StepKind,
        /// The step that asked for it.
        requested_by: StepKind,
    },
}

/// Errors raised while binding a prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    /// The template declares a placeholder that was not supplied.
    #[error("Template '{template}' is missing a value for '{{{name}}}'")]
    MissingVariable {
        /// The template name.
        template: String,
        /// The placeholder name.
        name: String,
    },

    /// A value was supplied for a placeholder the template does not declare.
    #[error("Template '{template}' does not declare '{{{name}}}'")]
    UnexpectedVariable {
        /// The template name.
        template: String,
        /// The supplied name.
        name: String,
    },
}

/// Errors raised by a model service.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The transport failed (connection, TLS, body read).
    #[error("Model transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Model service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The service answered with something that is not a completion.
    #[error("Malformed model response: {0}")]
    Malformed(String),

    /// The service is not configured (e.g. no API key).
    #[error("Model service not configured: {0}")]
    NotConfigured(String),
}

impl ModelError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a malformed-response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// A model response that does not satisfy its step's schema.
#[derive(Debug, Clone, Error)]
#[error("Step {step} response does not match its schema: {reason}")]
pub struct StepParseError {
    /// The step whose response was rejected.
    pub step: StepKind,
    /// Why it was rejected.
    pub reason: String,
}

impl StepParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(step: StepKind, reason: impl Into<String>) -> Self {
        Self {
            step,
            reason: reason.into(),
        }
    }
}

/// Why a single step failed, before fallback policy is applied.
#[derive(Debug, Clone, Error)]
pub enum StepFailure {
    /// The model call failed.
    #[error("{0}")]
    Model(#[from] ModelError),

    /// The response did not parse.
    #[error("{0}")]
    Parse(#[from] StepParseError),

    /// The step exceeded its time budget.
    #[error("Step timed out after {0}s")]
    Timeout(f64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validation_error_lists_all_fields() {
        let err = ValidationError::new(vec![
            FieldViolation {
                field: "client_name".to_string(),
                message: "must not be empty".to_string(),
            },
            FieldViolation {
                field: "tone_of_voice".to_string(),
                message: "must contain at least 1 entry".to_string(),
            },
        ]);

        assert_eq!(
            err.to_string(),
            "Invalid request: client_name: must not be empty; tone_of_voice: must contain at least 1 entry"
        );
        assert!(err.has_field("tone_of_voice"));
        assert!(!err.has_field("target_audience"));
    }

    #[test]
    fn test_validation_error_to_dict() {
        let err = ValidationError::single("client_name", "too long");
        let dict = err.to_dict();

        assert!(dict.contains_key("message"));
        assert_eq!(
            dict.get("violations"),
            Some(&serde_json::json!([{"field": "client_name", "message": "too long"}]))
        );
    }

    #[test]
    fn test_context_error_messages() {
        let err = ContextError::Missing {
            missing: StepKind::ProductAnalysis,
            requested_by: StepKind::CreativeIdeation,
        };
        assert_eq!(
            err.to_string(),
            "Step 3 (creative_ideation) requires the result of step 1 (product_analysis), which is not available"
        );
    }

    #[test]
    fn test_prompt_error_message() {
        let err = PromptError::MissingVariable {
            template: "product_analysis".to_string(),
            name: "client_name".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Template 'product_analysis' is missing a value for '{client_name}'"
        );
    }

    #[test]
    fn test_timeout_constructors() {
        let err = CreativeflowError::step_timeout(StepKind::ContentGeneration, 2.5);
        assert_eq!(err.to_string(), "Timed out after 2.5s (content_generation)");

        let err = CreativeflowError::run_timeout(30.0);
        assert_eq!(err.to_string(), "Timed out after 30s (run)");
    }

    #[test]
    fn test_step_failure_from_model_error() {
        let failure: StepFailure = ModelError::transport("connection reset").into();
        assert!(matches!(failure, StepFailure::Model(ModelError::Transport(_))));
    }
}
