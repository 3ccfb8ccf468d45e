//! Prompt templates and per-step prompt binding.
//!
//! Each step has a named template with `{placeholder}` variables. Binding is
//! strict: a template must accept exactly the variables its step supplies.

mod bind;
mod set;
mod template;

pub use bind::{bind_step, step_variables};
pub use set::PromptSet;
pub use template::{Prompt, PromptTemplate};
