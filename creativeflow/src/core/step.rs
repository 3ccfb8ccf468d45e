//! The six pipeline steps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One stage of the six-stage pipeline.
///
/// Steps are ordered; `StepKind::ALL` is the execution order and
/// [`StepKind::index`] is the 1-based position carried on stream events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Step 1: extract product features and positioning.
    ProductAnalysis,
    /// Step 2: characterize the audience and how to talk to it.
    AudienceAnalysis,
    /// Step 3: propose creative angles.
    CreativeIdeation,
    /// Step 4: write the marketing copy.
    ContentGeneration,
    /// Step 5: propose channels and tactics.
    MarketingSuggestions,
    /// Step 6: executive report or final narrative.
    FinalSynthesis,
}

impl StepKind {
    /// All steps in execution order.
    pub const ALL: [Self; 6] = [
        Self::ProductAnalysis,
        Self::AudienceAnalysis,
        Self::CreativeIdeation,
        Self::ContentGeneration,
        Self::MarketingSuggestions,
        Self::FinalSynthesis,
    ];

    /// Returns the 1-based step index.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::ProductAnalysis => 1,
            Self::AudienceAnalysis => 2,
            Self::CreativeIdeation => 3,
            Self::ContentGeneration => 4,
            Self::MarketingSuggestions => 5,
            Self::FinalSynthesis => 6,
        }
    }

    /// Looks a step up by its 1-based index.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.index() == index)
    }

    /// Returns the machine name used in logs and template names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ProductAnalysis => "product_analysis",
            Self::AudienceAnalysis => "audience_analysis",
            Self::CreativeIdeation => "creative_ideation",
            Self::ContentGeneration => "content_generation",
            Self::MarketingSuggestions => "marketing_suggestions",
            Self::FinalSynthesis => "final_synthesis",
        }
    }

    /// Returns the human-readable title sent with `step_start`.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ProductAnalysis => "Product Analysis",
            Self::AudienceAnalysis => "Audience Analysis",
            Self::CreativeIdeation => "Creative Ideation",
            Self::ContentGeneration => "Content Generation",
            Self::MarketingSuggestions => "Marketing Suggestions",
            Self::FinalSynthesis => "Final Synthesis",
        }
    }

    /// Returns the steps whose results this step reads.
    #[must_use]
    pub const fn prerequisites(self) -> &'static [Self] {
        match self {
            Self::ProductAnalysis | Self::AudienceAnalysis => &[],
            Self::CreativeIdeation => &[Self::ProductAnalysis, Self::AudienceAnalysis],
            Self::ContentGeneration => &[
                Self::ProductAnalysis,
                Self::AudienceAnalysis,
                Self::CreativeIdeation,
            ],
            Self::MarketingSuggestions => &[Self::ContentGeneration],
            Self::FinalSynthesis => &[
                Self::ProductAnalysis,
                Self::AudienceAnalysis,
                Self::CreativeIdeation,
                Self::ContentGeneration,
                Self::MarketingSuggestions,
            ],
        }
    }
}

/// How a run executes its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Blocking calls, structured records, per-step fallbacks.
    Batch,
    /// Token-streamed calls, raw text results, fail-fast.
    Streaming,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch => write!(f, "batch"),
            Self::Streaming => write!(f, "streaming"),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_indices_follow_execution_order() {
        let indices: Vec<u8> = StepKind::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_from_index_round_trips() {
        for step in StepKind::ALL {
            assert_eq!(StepKind::from_index(step.index()), Some(step));
        }
        assert_eq!(StepKind::from_index(0), None);
        assert_eq!(StepKind::from_index(7), None);
    }

    #[test]
    fn test_prerequisites_precede_step() {
        for step in StepKind::ALL {
            for prereq in step.prerequisites() {
                assert!(prereq < &step, "{prereq} must run before {step}");
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(StepKind::FinalSynthesis.to_string(), "6 (final_synthesis)");
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&StepKind::MarketingSuggestions).unwrap();
        assert_eq!(json, r#""marketing_suggestions""#);
    }
}
