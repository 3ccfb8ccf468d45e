//! Events emitted by a streaming pipeline run.

use serde::{Deserialize, Serialize};

use super::StepKind;

/// An event in a streaming run.
///
/// Serialized with a `type` tag, one JSON object per event:
///
/// ```json
/// {"type":"step_start","step":1,"title":"Product Analysis"}
/// {"type":"step_stream","step":1,"content":"The "}
/// {"type":"step_complete","step":1,"data":"The product ..."}
/// {"type":"complete","final_content":"..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A step is about to call the model.
    StepStart {
        /// 1-based step index.
        step: u8,
        /// Human-readable step title.
        title: String,
    },

    /// One text fragment received from the model.
    StepStream {
        /// 1-based step index.
        step: u8,
        /// The fragment, forwarded as received.
        content: String,
    },

    /// A step finished; `data` is the concatenation of its fragments.
    StepComplete {
        /// 1-based step index.
        step: u8,
        /// The step's full text.
        data: String,
    },

    /// The run failed. Always the last event of a failed run.
    Error {
        /// The step that failed, if the failure happened inside one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<u8>,
        /// The failure message.
        message: String,
    },

    /// The run finished. Always the last event of a successful run.
    Complete {
        /// Step 6's full text.
        final_content: String,
    },
}

impl StreamEvent {
    /// Creates a `step_start` event.
    #[must_use]
    pub fn step_start(step: StepKind) -> Self {
        Self::StepStart {
            step: step.index(),
            title: step.title().to_string(),
        }
    }

    /// Creates a `step_stream` event.
    #[must_use]
    pub fn step_stream(step: StepKind, content: impl Into<String>) -> Self {
        Self::StepStream {
            step: step.index(),
            content: content.into(),
        }
    }

    /// Creates a `step_complete` event.
    #[must_use]
    pub fn step_complete(step: StepKind, data: impl Into<String>) -> Self {
        Self::StepComplete {
            step: step.index(),
            data: data.into(),
        }
    }

    /// Creates an `error` event.
    #[must_use]
    pub fn error(step: Option<StepKind>, message: impl Into<String>) -> Self {
        Self::Error {
            step: step.map(StepKind::index),
            message: message.into(),
        }
    }

    /// Creates a `complete` event.
    #[must_use]
    pub fn complete(final_content: impl Into<String>) -> Self {
        Self::Complete {
            final_content: final_content.into(),
        }
    }

    /// Returns the step index this event belongs to, if any.
    #[must_use]
    pub fn step(&self) -> Option<u8> {
        match self {
            Self::StepStart { step, .. }
            | Self::StepStream { step, .. }
            | Self::StepComplete { step, .. } => Some(*step),
            Self::Error { step, .. } => *step,
            Self::Complete { .. } => None,
        }
    }

    /// Returns true for `complete` and `error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// Returns the wire name of the event kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StepStart { .. } => "step_start",
            Self::StepStream { .. } => "step_stream",
            Self::StepComplete { .. } => "step_complete",
            Self::Error { .. } => "error",
            Self::Complete { .. } => "complete",
        }
    }
}
