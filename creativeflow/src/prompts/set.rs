//! The default prompt templates and per-step selection.

use super::PromptTemplate;
use crate::core::{ExecutionMode, StepKind};

const PRODUCT_ANALYSIS: &str = r#"You are a senior brand strategist.
Analyze the following product for the brand "{client_name}".

Product description:
{product_description}

Respond with a single JSON object and nothing else:
{"product_name": "...", "key_features": ["..."], "unique_selling_point": "...", "product_category": "..."}"#;

const AUDIENCE_ANALYSIS: &str = r#"You are a consumer insights researcher.
Analyze this target audience: {target_audience}
The brand wants to speak in this tone: {tone_of_voice}

Respond with a single JSON object and nothing else:
{"demographic": "...", "psychographic": "...", "pain_points": ["..."], "desires": ["..."], "communication_style": "..."}"#;

const CREATIVE_IDEATION: &str = r#"You are a creative director.
Using the product analysis and audience analysis below, propose three distinct creative ideas.

Product analysis:
{product_analysis}

Audience analysis:
{audience_analysis}

Tone of voice: {tone_of_voice}

Respond with a single JSON object and nothing else:
{"creative_ideas": [{"idea_title": "...", "concept": "...", "angle": "..."}]}"#;

const CONTENT_GENERATION: &str = r#"You are an award-winning copywriter.
Write marketing content built on the strongest of the creative ideas.

Product analysis:
{product_analysis}

Audience analysis:
{audience_analysis}

Creative ideas:
{creative_ideas}

Tone of voice: {tone_of_voice}

Respond with a single JSON object and nothing else:
{"generated_content": "...", "creative_angle_used": "...", "key_messages": ["..."]}"#;

const MARKETING_SUGGESTIONS: &str = r#"You are a growth marketer.
Suggest channels and tactics to distribute this content to {target_audience}.

Content:
{generated_content}

Tone of voice: {tone_of_voice}

Respond with a single JSON object and nothing else:
{"marketing_suggestions": [{"channel": "...", "tactic": "...", "timing": "..."}]}"#;

const EXECUTIVE_REPORT: &str = r#"You are a marketing consultant preparing an executive report.
Combine all of the work below into one plan for {target_audience}, adapted to the local market and culture.

Product analysis:
{product_analysis}

Audience analysis:
{audience_analysis}

Creative ideas:
{creative_ideas}

Content:
{generated_content}

Marketing suggestions:
{marketing_suggestions}

Tone of voice: {tone_of_voice}

Respond with a single JSON object and nothing else:
{"executive_summary": "...", "localized_messaging": "...", "cultural_insights": ["..."], "implementation_roadmap": [{"phase": "...", "actions": ["..."], "timeline": "..."}], "success_metrics": ["..."], "final_recommendations": "..."}"#;

const FINAL_CONTENT: &str = r"You are the brand's voice.
Turn all of the work below into one finished, friendly message ready to publish for {target_audience}.
Write plain text, not JSON.

Product analysis:
{product_analysis}

Audience analysis:
{audience_analysis}

Creative ideas:
{creative_ideas}

Content:
{generated_content}

Marketing suggestions:
{marketing_suggestions}

Tone of voice: {tone_of_voice}";

/// The templates a pipeline binds its steps with.
///
/// Steps 1–5 share one template across modes. Step 6 has two: a structured
/// executive report for batch runs and a plain-text final message for
/// streaming runs.
#[derive(Debug, Clone)]
pub struct PromptSet {
    product_analysis: PromptTemplate,
    audience_analysis: PromptTemplate,
    creative_ideation: PromptTemplate,
    content_generation: PromptTemplate,
    marketing_suggestions: PromptTemplate,
    executive_report: PromptTemplate,
    final_content: PromptTemplate,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            product_analysis: PromptTemplate::new("product_analysis", PRODUCT_ANALYSIS),
            audience_analysis: PromptTemplate::new("audience_analysis", AUDIENCE_ANALYSIS),
            creative_ideation: PromptTemplate::new("creative_ideation", CREATIVE_IDEATION),
            content_generation: PromptTemplate::new("content_generation", CONTENT_GENERATION),
            marketing_suggestions: PromptTemplate::new(
                "marketing_suggestions",
                MARKETING_SUGGESTIONS,
            ),
            executive_report: PromptTemplate::new("executive_report", EXECUTIVE_REPORT),
            final_content: PromptTemplate::new("final_content", FINAL_CONTENT),
        }
    }
}

impl PromptSet {
    /// Creates the default prompt set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the template a step uses in the given mode.
    #[must_use]
    pub fn template(&self, step: StepKind, mode: ExecutionMode) -> &PromptTemplate {
        match (step, mode) {
            (StepKind::ProductAnalysis, _) => &self.product_analysis,
            (StepKind::AudienceAnalysis, _) => &self.audience_analysis,
            (StepKind::CreativeIdeation, _) => &self.creative_ideation,
            (StepKind::ContentGeneration, _) => &self.content_generation,
            (StepKind::MarketingSuggestions, _) => &self.marketing_suggestions,
            (StepKind::FinalSynthesis, ExecutionMode::Batch) => &self.executive_report,
            (StepKind::FinalSynthesis, ExecutionMode::Streaming) => &self.final_content,
        }
    }

    /// Replaces the template a step uses in the given mode.
    ///
    /// For steps 1–5 the replacement applies to both modes.
    #[must_use]
    pub fn with_template(mut self, step: StepKind, mode: ExecutionMode, template: PromptTemplate) -> Self {
        let slot = match (step, mode) {
            (StepKind::ProductAnalysis, _) => &mut self.product_analysis,
            (StepKind::AudienceAnalysis, _) => &mut self.audience_analysis,
            (StepKind::CreativeIdeation, _) => &mut self.creative_ideation,
            (StepKind::ContentGeneration, _) => &mut self.content_generation,
            (StepKind::MarketingSuggestions, _) => &mut self.marketing_suggestions,
            (StepKind::FinalSynthesis, ExecutionMode::Batch) => &mut self.executive_report,
            (StepKind::FinalSynthesis, ExecutionMode::Streaming) => &mut self.final_content,
        };
        *slot = template;
        self
    }
}
