//! Request fixtures and canned model replies.

use serde_json::json;

use crate::context::PipelineRequest;

/// The reference request used across the test suite.
#[must_use]
pub fn lumen_request() -> PipelineRequest {
    PipelineRequest::new(
        "Lumen",
        "a 200ml natural juice with no added sugar",
        "health-conscious young adults aged 20-35",
        vec!["friendly".to_string(), "modern".to_string()],
    )
}

/// A valid reply for each default template, keyed by template name.
///
/// Structured templates get a JSON object matching their step's record;
/// `final_content` gets plain prose.
#[must_use]
pub fn canned_reply(template: &str) -> Option<String> {
    let value = match template {
        "product_analysis" => json!({
            "product_name": "Lumen",
            "key_features": ["200ml bottle", "100% natural", "No added sugar"],
            "unique_selling_point": "Real fruit taste with zero added sugar",
            "product_category": "Beverages"
        }),
        "audience_analysis" => json!({
            "demographic": "Adults aged 20-35",
            "psychographic": "Health-conscious and active",
            "pain_points": ["Sugary drinks", "Artificial ingredients"],
            "desires": ["Natural energy", "Clean labels"],
            "communication_style": "Friendly and modern"
        }),
        "creative_ideation" => json!({
            "creative_ideas": [
                {"idea_title": "Pure Morning", "concept": "Start the day clean", "angle": "Routine"},
                {"idea_title": "Nothing Added", "concept": "Show the label", "angle": "Transparency"},
                {"idea_title": "Glow Up", "concept": "Feel the difference", "angle": "Wellbeing"}
            ]
        }),
        "content_generation" => json!({
            "generated_content": "Lumen: all fruit, no added sugar. Your glow, bottled.",
            "creative_angle_used": "Transparency",
            "key_messages": ["No added sugar", "100% natural", "Made for busy days"]
        }),
        "marketing_suggestions" => json!({
            "marketing_suggestions": [
                {"channel": "Instagram", "tactic": "Reels with taste tests", "timing": "Launch week"},
                {"channel": "Gyms", "tactic": "Free samples after classes", "timing": "Weekday evenings"}
            ]
        }),
        "executive_report" => json!({
            "executive_summary": "Launch Lumen as the clean-label juice for young professionals.",
            "localized_messaging": "Fresh, honest, and made for your day.",
            "cultural_insights": ["Morning routines matter", "Trust in clean labels"],
            "implementation_roadmap": [
                {"phase": "Launch", "actions": ["Seed influencers", "Open sampling"], "timeline": "Month 1"}
            ],
            "success_metrics": ["Trial rate", "Repeat purchase"],
            "final_recommendations": "Lead with transparency and sampling."
        }),
        "final_content" => {
            return Some(
                "Meet Lumen: 200ml of pure fruit with nothing added. Fresh mornings start here."
                    .to_string(),
            )
        }
        _ => return None,
    };
    Some(value.to_string())
}
