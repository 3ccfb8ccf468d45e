//! The pipeline request and its bounds.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::errors::{FieldViolation, ValidationError};

/// Allowed length of `client_name`, in characters.
pub const CLIENT_NAME_CHARS: RangeInclusive<usize> = 1..=200;
/// Allowed length of `product_description`, in characters.
pub const PRODUCT_DESCRIPTION_CHARS: RangeInclusive<usize> = 10..=2000;
/// Allowed length of `target_audience`, in characters.
pub const TARGET_AUDIENCE_CHARS: RangeInclusive<usize> = 5..=500;
/// Allowed number of tone descriptors.
pub const TONE_ENTRIES: RangeInclusive<usize> = 1..=10;

/// The four caller-supplied inputs of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// Name of the client or brand.
    pub client_name: String,
    /// Description of the product or service.
    pub product_description: String,
    /// Description of the target audience.
    pub target_audience: String,
    /// Desired tones, in priority order.
    pub tone_of_voice: Vec<String>,
}

impl PipelineRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(
        client_name: impl Into<String>,
        product_description: impl Into<String>,
        target_audience: impl Into<String>,
        tone_of_voice: Vec<String>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            product_description: product_description.into(),
            target_audience: target_audience.into(),
            tone_of_voice,
        }
    }

    /// Checks every field bound and reports all violations at once.
    ///
    /// Lengths are counted in characters, not bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing each violated bound.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        check_chars(&mut violations, "client_name", &self.client_name, &CLIENT_NAME_CHARS);
        check_chars(
            &mut violations,
            "product_description",
            &self.product_description,
            &PRODUCT_DESCRIPTION_CHARS,
        );
        check_chars(
            &mut violations,
            "target_audience",
            &self.target_audience,
            &TARGET_AUDIENCE_CHARS,
        );

        let tones = self.tone_of_voice.len();
        if !TONE_ENTRIES.contains(&tones) {
            violations.push(FieldViolation {
                field: "tone_of_voice".to_string(),
                message: format!(
                    "must contain between {} and {} entries, got {tones}",
                    TONE_ENTRIES.start(),
                    TONE_ENTRIES.end()
                ),
            });
        }
        for (i, tone) in self.tone_of_voice.iter().enumerate() {
            if tone.trim().is_empty() {
                violations.push(FieldViolation {
                    field: format!("tone_of_voice[{i}]"),
                    message: "must not be blank".to_string(),
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }

    /// Joins the tone descriptors into one directive, e.g. `"friendly, modern"`.
    #[must_use]
    pub fn tone_directive(&self) -> String {
        self.tone_of_voice.join(", ")
    }
}

fn check_chars(
    violations: &mut Vec<FieldViolation>,
    field: &str,
    value: &str,
    bounds: &RangeInclusive<usize>,
) {
    let len = value.chars().count();
    if !bounds.contains(&len) {
        violations.push(FieldViolation {
            field: field.to_string(),
            message: format!(
                "length must be between {} and {} characters, got {len}",
                bounds.start(),
                bounds.end()
            ),
        });
    }
}
