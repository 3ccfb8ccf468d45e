//! The aggregated batch-mode result.

use serde::{Deserialize, Serialize};

use super::{ExecutiveReport, GeneratedContent, MarketingSuggestions};

/// What a batch run returns to its caller.
///
/// Joins step 4's content with a flattened view of step 5 and, when requested,
/// the full step 6 report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeResult {
    /// The client the content was written for.
    pub client_name: String,
    /// Step 4's marketing copy.
    pub generated_content: String,
    /// Step 4's chosen creative angle.
    pub creative_angle: String,
    /// Step 5's suggestions rendered as `"{tactic} ({channel})"`.
    pub marketing_suggestions: Vec<String>,
    /// Step 4's key messages.
    pub key_messages: Vec<String>,
    /// Step 6's report, present only when it was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_report: Option<ExecutiveReport>,
}

impl CreativeResult {
    /// Assembles the result from the step records.
    #[must_use]
    pub fn assemble(
        client_name: impl Into<String>,
        content: &GeneratedContent,
        suggestions: &MarketingSuggestions,
        executive_report: Option<ExecutiveReport>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            generated_content: content.generated_content.clone(),
            creative_angle: content.creative_angle_used.clone(),
            marketing_suggestions: suggestions
                .marketing_suggestions
                .iter()
                .map(super::MarketingSuggestion::summary)
                .collect(),
            key_messages: content.key_messages.clone(),
            executive_report,
        }
    }
}
