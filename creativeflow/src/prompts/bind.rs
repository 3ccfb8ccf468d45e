//! Binding a step's template against the run context.

use super::{Prompt, PromptSet};
use crate::context::PipelineContext;
use crate::core::{ExecutionMode, StepKind};
use crate::errors::CreativeflowError;

/// The placeholder under which a step's result is passed to later steps.
const fn result_variable(step: StepKind) -> &'static str {
    match step {
        StepKind::ProductAnalysis => "product_analysis",
        StepKind::AudienceAnalysis => "audience_analysis",
        StepKind::CreativeIdeation => "creative_ideas",
        StepKind::ContentGeneration => "generated_content",
        StepKind::MarketingSuggestions => "marketing_suggestions",
        StepKind::FinalSynthesis => "final_content",
    }
}

/// Collects the variables a step's template is bound with.
///
/// Request fields are taken from the context's request; every prerequisite's
/// result is rendered with [`StepResult::prompt_text`](crate::context::StepResult::prompt_text).
///
/// # Errors
///
/// Fails with [`CreativeflowError::Context`] if a prerequisite has no result.
pub fn step_variables(
    step: StepKind,
    ctx: &PipelineContext,
) -> Result<Vec<(&'static str, String)>, CreativeflowError> {
    let request = ctx.request();
    let mut vars = match step {
        StepKind::ProductAnalysis => vec![
            ("client_name", request.client_name.clone()),
            ("product_description", request.product_description.clone()),
        ],
        StepKind::AudienceAnalysis => vec![
            ("target_audience", request.target_audience.clone()),
            ("tone_of_voice", request.tone_directive()),
        ],
        StepKind::CreativeIdeation | StepKind::ContentGeneration => {
            vec![("tone_of_voice", request.tone_directive())]
        }
        StepKind::MarketingSuggestions | StepKind::FinalSynthesis => vec![
            ("target_audience", request.target_audience.clone()),
            ("tone_of_voice", request.tone_directive()),
        ],
    };

    for &prereq in step.prerequisites() {
        let text = ctx.require(prereq, step)?.prompt_text()?;
        vars.push((result_variable(prereq), text.into_owned()));
    }

    Ok(vars)
}

/// Binds the prompt for `step` in `mode`.
///
/// # Errors
///
/// Fails if a prerequisite is missing or the template does not accept exactly
/// the step's variables.
pub fn bind_step(
    prompts: &PromptSet,
    step: StepKind,
    mode: ExecutionMode,
    ctx: &PipelineContext,
) -> Result<Prompt, CreativeflowError> {
    let vars = step_variables(step, ctx)?;
    Ok(prompts.template(step, mode).render(&vars)?)
}
