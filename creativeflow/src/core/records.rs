//! Structured step records and their fallbacks.
//!
//! Each record is the schema of one step's batch-mode output. Field names are
//! the wire keys the prompts ask the model to produce; serde treats every field
//! as required, so a response missing a key fails to parse. Unknown keys are
//! ignored.
//!
//! Every record also has a pure, deterministic `fallback` used when the step's
//! model call or parse fails.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::StepKind;
use crate::context::PipelineRequest;

/// A step output schema.
pub trait StepSchema:
    Serialize + DeserializeOwned + Clone + Send + Sync + Into<StepRecord> + 'static
{
    /// The step producing this record.
    const STEP: StepKind;

    /// Checks constraints serde cannot express.
    ///
    /// Returns the reason the record is unusable.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }

    /// Builds the placeholder record substituted on failure.
    fn fallback(request: &PipelineRequest) -> Self;
}

fn require_non_empty<T>(field: &str, items: &[T]) -> Result<(), String> {
    if items.is_empty() {
        Err(format!("'{field}' must not be empty"))
    } else {
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("'{field}' must not be blank"))
    } else {
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Step 1 output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAnalysis {
    pub product_name: String,
    pub key_features: Vec<String>,
    pub unique_selling_point: String,
    pub product_category: String,
}

impl StepSchema for ProductAnalysis {
    const STEP: StepKind = StepKind::ProductAnalysis;

    fn fallback(request: &PipelineRequest) -> Self {
        Self {
            product_name: request.client_name.clone(),
            key_features: strings(&["Distinctive", "High quality", "Reliable"]),
            unique_selling_point: "A unique, one-of-a-kind product".to_string(),
            product_category: "Product".to_string(),
        }
    }
}

/// Step 2 output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceAnalysis {
    pub demographic: String,
    pub psychographic: String,
    pub pain_points: Vec<String>,
    pub desires: Vec<String>,
    pub communication_style: String,
}

impl StepSchema for AudienceAnalysis {
    const STEP: StepKind = StepKind::AudienceAnalysis;

    fn fallback(request: &PipelineRequest) -> Self {
        Self {
            demographic: request.target_audience.clone(),
            psychographic: "Looks for quality and reliability".to_string(),
            pain_points: strings(&["Finding good options", "Lack of trust"]),
            desires: strings(&["High quality", "Fair price", "Good service"]),
            communication_style: request.tone_directive(),
        }
    }
}

/// A single idea proposed by step 3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeIdea {
    pub idea_title: String,
    pub concept: String,
    pub angle: String,
}

/// Step 3 output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeIdeas {
    pub creative_ideas: Vec<CreativeIdea>,
}

impl StepSchema for CreativeIdeas {
    const STEP: StepKind = StepKind::CreativeIdeation;

    fn check(&self) -> Result<(), String> {
        require_non_empty("creative_ideas", &self.creative_ideas)
    }

    fn fallback(_request: &PipelineRequest) -> Self {
        let idea = |title: &str, concept: &str, angle: &str| CreativeIdea {
            idea_title: title.to_string(),
            concept: concept.to_string(),
            angle: angle.to_string(),
        };
        Self {
            creative_ideas: vec![
                idea("First idea", "Focus on quality and reliability", "Trust and dependability"),
                idea("Second idea", "Focus on benefit and value", "Added value"),
                idea("Third idea", "Focus on emotional connection", "Emotional connection"),
            ],
        }
    }
}

/// Step 4 output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub generated_content: String,
    pub creative_angle_used: String,
    pub key_messages: Vec<String>,
}

impl StepSchema for GeneratedContent {
    const STEP: StepKind = StepKind::ContentGeneration;

    fn check(&self) -> Result<(), String> {
        require_text("generated_content", &self.generated_content)
    }

    fn fallback(_request: &PipelineRequest) -> Self {
        Self {
            generated_content: "Creative marketing copy that brings quality and reliability together."
                .to_string(),
            creative_angle_used: "Focus on value and trust".to_string(),
            key_messages: strings(&["High quality", "Reliable", "Made for your needs"]),
        }
    }
}

/// A single channel recommendation from step 5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketingSuggestion {
    pub channel: String,
    pub tactic: String,
    pub timing: String,
}

impl MarketingSuggestion {
    /// Renders the suggestion as `"{tactic} ({channel})"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} ({})", self.tactic, self.channel)
    }
}

/// Step 5 output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketingSuggestions {
    pub marketing_suggestions: Vec<MarketingSuggestion>,
}

impl StepSchema for MarketingSuggestions {
    const STEP: StepKind = StepKind::MarketingSuggestions;

    fn check(&self) -> Result<(), String> {
        require_non_empty("marketing_suggestions", &self.marketing_suggestions)
    }

    fn fallback(_request: &PipelineRequest) -> Self {
        let suggestion = |channel: &str, tactic: &str, timing: &str| MarketingSuggestion {
            channel: channel.to_string(),
            tactic: tactic.to_string(),
            timing: timing.to_string(),
        };
        Self {
            marketing_suggestions: vec![
                suggestion("Social media", "Post engaging content daily", "At peak hours"),
                suggestion("Email", "Send a regular newsletter", "Weekly"),
                suggestion(
                    "Influencer partnerships",
                    "Partner with niche influencers",
                    "Seasonal campaigns",
                ),
            ],
        }
    }
}

/// One phase of the executive report's roadmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapPhase {
    pub phase: String,
    pub actions: Vec<String>,
    pub timeline: String,
}

/// Step 6 output in batch mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveReport {
    pub executive_summary: String,
    pub localized_messaging: String,
    pub cultural_insights: Vec<String>,
    pub implementation_roadmap: Vec<RoadmapPhase>,
    pub success_metrics: Vec<String>,
    pub final_recommendations: String,
}

impl StepSchema for ExecutiveReport {
    const STEP: StepKind = StepKind::FinalSynthesis;

    fn check(&self) -> Result<(), String> {
        require_text("executive_summary", &self.executive_summary)
    }

    fn fallback(_request: &PipelineRequest) -> Self {
        Self {
            executive_summary: "A consolidated summary of every previous step".to_string(),
            localized_messaging: "Messaging adapted to the local market".to_string(),
            cultural_insights: strings(&[
                "Deep understanding of the local market",
                "Respect for cultural values",
                "Adapting to local expectations",
            ]),
            implementation_roadmap: vec![RoadmapPhase {
                phase: "Launch".to_string(),
                actions: strings(&["Prepare the content", "Set up the campaigns"]),
                timeline: "Two weeks".to_string(),
            }],
            success_metrics: strings(&[
                "Increased awareness",
                "Better engagement",
                "Higher sales",
            ]),
            final_recommendations: "End-to-end recommendations for a successful rollout"
                .to_string(),
        }
    }
}

/// Any structured step record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepRecord {
    ProductAnalysis(ProductAnalysis),
    AudienceAnalysis(AudienceAnalysis),
    CreativeIdeas(CreativeIdeas),
    GeneratedContent(GeneratedContent),
    MarketingSuggestions(MarketingSuggestions),
    ExecutiveReport(ExecutiveReport),
}

impl StepRecord {
    /// Returns the step that produced this record.
    #[must_use]
    pub fn step(&self) -> StepKind {
        match self {
            Self::ProductAnalysis(_) => ProductAnalysis::STEP,
            Self::AudienceAnalysis(_) => AudienceAnalysis::STEP,
            Self::CreativeIdeas(_) => CreativeIdeas::STEP,
            Self::GeneratedContent(_) => GeneratedContent::STEP,
            Self::MarketingSuggestions(_) => MarketingSuggestions::STEP,
            Self::ExecutiveReport(_) => ExecutiveReport::STEP,
        }
    }

    /// Serializes the record to compact JSON for use inside a later prompt.
    pub fn to_prompt_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

macro_rules! impl_into_record {
    ($($ty:ident),* $(,)?) => {
        $(
            impl From<$ty> for StepRecord {
                fn from(record: $ty) -> Self {
                    Self::$ty(record)
                }
            }
        )*
    };
}

impl_into_record!(
    ProductAnalysis,
    AudienceAnalysis,
    CreativeIdeas,
    GeneratedContent,
    MarketingSuggestions,
    ExecutiveReport,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::lumen_request;
    use pretty_assertions::assert_eq;

    fn assert_fallback_is_valid<T: StepSchema + std::fmt::Debug + PartialEq>() {
        let request = lumen_request();
        let first = T::fallback(&request);
        let second = T::fallback(&request);

        assert_eq!(first, second, "fallback for {} must be deterministic", T::STEP);
        assert_eq!(first.check(), Ok(()));

        // The fallback must itself satisfy the schema it stands in for.
        let json = serde_json::to_string(&first).unwrap();
        let reparsed: T = serde_json::from_str(&json).unwrap();
        assert_eq!(reparsed, first);
    }

    #[test]
    fn test_every_fallback_satisfies_its_schema() {
        assert_fallback_is_valid::<ProductAnalysis>();
        assert_fallback_is_valid::<AudienceAnalysis>();
        assert_fallback_is_valid::<CreativeIdeas>();
        assert_fallback_is_valid::<GeneratedContent>();
        assert_fallback_is_valid::<MarketingSuggestions>();
        assert_fallback_is_valid::<ExecutiveReport>();
    }

    #[test]
    fn test_fallbacks_carry_request_fields() {
        let request = lumen_request();

        assert_eq!(ProductAnalysis::fallback(&request).product_name, "Lumen");

        let audience = AudienceAnalysis::fallback(&request);
        assert_eq!(audience.demographic, request.target_audience);
        assert_eq!(audience.communication_style, "friendly, modern");
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let json = r#"{"product_name": "Lumen", "key_features": [], "product_category": "Drinks"}"#;
        let parsed: Result<ProductAnalysis, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let json = r#"{
            "generated_content": "Fresh.",
            "creative_angle_used": "Health",
            "key_messages": ["No sugar"],
            "word_count": 1
        }"#;
        let parsed: GeneratedContent = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.key_messages, vec!["No sugar".to_string()]);
    }

    #[test]
    fn test_empty_suggestions_fail_check() {
        let record = MarketingSuggestions {
            marketing_suggestions: Vec::new(),
        };
        assert!(record.check().is_err());
    }

    #[test]
    fn test_suggestion_summary() {
        let suggestion = MarketingSuggestion {
            channel: "Instagram".to_string(),
            tactic: "Reels with taste tests".to_string(),
            timing: "Launch week".to_string(),
        };
        assert_eq!(suggestion.summary(), "Reels with taste tests (Instagram)");
    }

    #[test]
    fn test_record_prompt_text_is_compact_json() {
        let record: StepRecord = GeneratedContent {
            generated_content: "عصير طبيعي".to_string(),
            creative_angle_used: "Health".to_string(),
            key_messages: vec!["Natural".to_string()],
        }
        .into();

        assert_eq!(record.step(), StepKind::ContentGeneration);
        assert_eq!(
            record.to_prompt_text().unwrap(),
            r#"{"generated_content":"عصير طبيعي","creative_angle_used":"Health","key_messages":["Natural"]}"#
        );
    }
}
