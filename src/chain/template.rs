//! `{{variable}}` prompt templates.

use crate::error::{ChainlabError, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("Invalid regex"));

/// A prompt with named placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
    input_variables: Vec<String>,
    partials: HashMap<String, String>,
}

impl PromptTemplate {
    /// Parse a template, collecting its placeholders in order of first use.
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let mut input_variables: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&template) {
            let name = caps[1].to_string();
            if !input_variables.contains(&name) {
                input_variables.push(name);
            }
        }

        Self {
            template,
            input_variables,
            partials: HashMap::new(),
        }
    }

    /// Values used when the caller does not supply a variable.
    pub fn with_partials(mut self, partials: &HashMap<String, String>) -> Self {
        self.partials.extend(partials.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names the template expects.
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Variables the caller still has to provide.
    pub fn required_variables(&self) -> Vec<&str> {
        self.input_variables
            .iter()
            .filter(|v| !self.partials.contains_key(*v))
            .map(|v| v.as_str())
            .collect()
    }

    /// Substitute every placeholder. Extra variables are ignored.
    pub fn format(&self, vars: &HashMap<String, String>) -> Result<String> {
        let missing: Vec<&str> = self
            .input_variables
            .iter()
            .filter(|v| !vars.contains_key(*v) && !self.partials.contains_key(*v))
            .map(|v| v.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(ChainlabError::Template(format!(
                "Missing variables: {}",
                missing.join(", ")
            )));
        }

        let rendered = PLACEHOLDER.replace_all(&self.template, |caps: &Captures| {
            let name = &caps[1];
            vars.get(name)
                .or_else(|| self.partials.get(name))
                .cloned()
                .unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

/// Build a variable map from pairs.
pub fn variables<'a, I>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infers_variables_in_order() {
        let template = PromptTemplate::new("{{b}} then {{ a }} then {{b}}");
        assert_eq!(template.input_variables(), &["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_format_substitutes() {
        let template =
            PromptTemplate::new("Question: {{query}}\nAnswer: Let's think step by step.");
        let text = template
            .format(&variables([("query", "What is a pulsar?"), ("unused", "x")]))
            .unwrap();
        assert_eq!(text, "Question: What is a pulsar?\nAnswer: Let's think step by step.");
    }

    #[test]
    fn test_missing_variable_is_error() {
        let template = PromptTemplate::new("{{question}} {{docs}}");
        let err = template.format(&variables([("question", "q")])).unwrap_err();
        assert!(matches!(err, ChainlabError::Template(msg) if msg.contains("docs")));
    }

    #[test]
    fn test_partials_sit_under_caller_values() {
        let partials = variables([("audience", "children"), ("topic", "stars")]);
        let template =
            PromptTemplate::new("Explain {{topic}} to {{audience}}").with_partials(&partials);

        assert_eq!(template.required_variables(), Vec::<&str>::new());
        let text = template.format(&variables([("topic", "quasars")])).unwrap();
        assert_eq!(text, "Explain quasars to children");
    }

    #[test]
    fn test_non_placeholder_braces_untouched() {
        let template = PromptTemplate::new("Question: ${Question} {{q}}");
        assert_eq!(template.input_variables(), &["q".to_string()]);
        assert_eq!(
            template.format(&variables([("q", "1+1")])).unwrap(),
            "Question: ${Question} 1+1"
        );
    }
}
