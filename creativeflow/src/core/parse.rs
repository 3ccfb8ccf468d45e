//! Parsing model responses into step records.
//!
//! Models wrap JSON in markdown fences or surround it with prose often enough
//! that a bare `serde_json::from_str` is not sufficient. Candidates are tried in
//! order: the trimmed response, the body of the first fenced block, and the
//! outermost `{ ... }` span.

use super::StepSchema;
use crate::errors::StepParseError;

/// Parses a raw model response into the step's record.
///
/// # Errors
///
/// Returns a [`StepParseError`] when no candidate deserializes into `T` or the
/// record fails [`StepSchema::check`].
pub fn parse_step_response<T: StepSchema>(raw: &str) -> Result<T, StepParseError> {
    let mut last_error = None;

    for candidate in json_candidates(raw) {
        match serde_json::from_str::<T>(candidate) {
            Ok(record) => {
                return record
                    .check()
                    .map(|()| record)
                    .map_err(|reason| StepParseError::new(T::STEP, reason));
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(StepParseError::new(
        T::STEP,
        last_error.unwrap_or_else(|| "response contains no JSON object".to_string()),
    ))
}

fn json_candidates(raw: &str) -> Vec<&str> {
    let mut candidates = Vec::with_capacity(3);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return candidates;
    }
    candidates.push(trimmed);

    if let Some(fenced) = fenced_block(trimmed) {
        candidates.push(fenced);
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            let span = &trimmed[start..=end];
            if !candidates.contains(&span) {
                candidates.push(span);
            }
        }
    }

    candidates
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip an optional language tag on the opening fence line.
    let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}
