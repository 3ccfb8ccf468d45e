//! Prompt templates with named placeholders.

use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use crate::errors::PromptError;

// Only `{identifier}` is a placeholder; JSON examples such as `{"key": ...}`
// in the template text are left alone.
#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_][a-z0-9_]*)\}").expect("placeholder pattern is valid"));

/// A fully bound prompt, ready to send to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Name of the template it was bound from.
    pub template: String,
    /// The bound prompt text.
    pub text: String,
}

/// A prompt template.
///
/// Placeholders are written `{name}`. The set of placeholders is derived from
/// the text when the template is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    text: String,
    placeholders: BTreeSet<String>,
}

impl PromptTemplate {
    /// Creates a template and collects its placeholders.
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let placeholders = PLACEHOLDER
            .captures_iter(&text)
            .map(|c| c[1].to_string())
            .collect();
        Self {
            name: name.into(),
            text,
            placeholders,
        }
    }

    /// Returns the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw template text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the declared placeholder names, sorted.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        self.placeholders.iter().map(String::as_str).collect()
    }

    /// Substitutes every placeholder.
    ///
    /// Exactly the declared placeholders must be supplied. Substituted values
    /// are not re-scanned, so values containing braces are inserted verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::MissingVariable`] for an unsupplied placeholder
    /// and [`PromptError::UnexpectedVariable`] for a value with no placeholder.
    pub fn render(&self, vars: &[(&str, String)]) -> Result<Prompt, PromptError> {
        let values: HashMap<&str, &str> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();

        if let Some(extra) = values.keys().find(|k| !self.placeholders.contains(**k)) {
            return Err(PromptError::UnexpectedVariable {
                template: self.name.clone(),
                name: (*extra).to_string(),
            });
        }
        if let Some(missing) = self
            .placeholders
            .iter()
            .find(|p| !values.contains_key(p.as_str()))
        {
            return Err(PromptError::MissingVariable {
                template: self.name.clone(),
                name: missing.clone(),
            });
        }

        let text = PLACEHOLDER
            .replace_all(&self.text, |caps: &regex::Captures<'_>| {
                values.get(&caps[1]).copied().unwrap_or_default().to_string()
            })
            .into_owned();

        Ok(Prompt {
            template: self.name.clone(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collects_placeholders() {
        let template = PromptTemplate::new(
            "t",
            r#"Brand {client_name}: {product_description}. Answer as {"product_name": "..."} for {client_name}."#,
        );
        assert_eq!(template.placeholders(), vec!["client_name", "product_description"]);
    }

    #[test]
    fn test_render_substitutes_all_occurrences() {
        let template = PromptTemplate::new("t", "{a} and {b} and {a}");
        let prompt = template
            .render(&[("a", "x".to_string()), ("b", "y".to_string())])
            .unwrap();
        assert_eq!(prompt.text, "x and y and x");
        assert_eq!(prompt.template, "t");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let template = PromptTemplate::new("t", "Input: {data}");
        let prompt = template
            .render(&[("data", r#"{"b": "{a}"}"#.to_string())])
            .unwrap();
        assert_eq!(prompt.text, r#"Input: {"b": "{a}"}"#);
    }

    #[test]
    fn test_missing_variable() {
        let template = PromptTemplate::new("t", "{a} {b}");
        let err = template.render(&[("a", "x".to_string())]).unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingVariable {
                template: "t".to_string(),
                name: "b".to_string()
            }
        );
    }

    #[test]
    fn test_unexpected_variable() {
        let template = PromptTemplate::new("t", "{a}");
        let err = template
            .render(&[("a", "x".to_string()), ("z", "y".to_string())])
            .unwrap_err();
        assert_eq!(
            err,
            PromptError::UnexpectedVariable {
                template: "t".to_string(),
                name: "z".to_string()
            }
        );
    }
}
