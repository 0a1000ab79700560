//! Linear prompt -> model -> parser chains.

mod template;

pub use template::{variables, PromptTemplate};

use crate::error::Result;
use crate::fallback::{invoke_with_fallback, FallbackResponse};
use crate::llm::ChatModel;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Post-processing applied to model output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputParser {
    /// Trim surrounding whitespace.
    #[default]
    Str,
    /// Drop line breaks, then trim.
    SingleLine,
}

impl OutputParser {
    pub fn parse(&self, text: &str) -> String {
        match self {
            OutputParser::Str => text.trim().to_string(),
            OutputParser::SingleLine => text.replace(['\r', '\n'], "").trim().to_string(),
        }
    }
}

/// A prompt template bound to a model and an output parser.
#[derive(Clone)]
pub struct LlmChain {
    prompt: PromptTemplate,
    model: Arc<dyn ChatModel>,
    parser: OutputParser,
}

impl LlmChain {
    pub fn new(prompt: PromptTemplate, model: Arc<dyn ChatModel>) -> Self {
        Self {
            prompt,
            model,
            parser: OutputParser::default(),
        }
    }

    pub fn with_parser(mut self, parser: OutputParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    /// Format the prompt, invoke the model, parse the output.
    #[instrument(skip(self, vars), fields(deployment = %self.model.deployment_id()))]
    pub async fn invoke(&self, vars: &HashMap<String, String>) -> Result<String> {
        let prompt = self.prompt.format(vars)?;
        debug!("Prompt: {} chars", prompt.len());
        let text = self.model.invoke_text(&prompt).await?;
        Ok(self.parser.parse(&text))
    }

    /// Like [`LlmChain::invoke`], but through the fallback sequence.
    ///
    /// Template errors also come back as degraded text.
    pub async fn invoke_or_degrade(&self, vars: &HashMap<String, String>) -> FallbackResponse {
        let prompt = match self.prompt.format(vars) {
            Ok(prompt) => prompt,
            Err(e) => {
                return FallbackResponse {
                    text: format!("ERROR: {}", e),
                    path: crate::fallback::InvocationPath::Degraded,
                }
            }
        };

        let mut response = invoke_with_fallback(self.model.as_ref(), &prompt).await;
        if !response.is_degraded() {
            response.text = self.parser.parse(&response.text);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainlabError;
    use crate::fallback::InvocationPath;
    use crate::test_support::ScriptedModel;

    #[test]
    fn test_single_line_parser() {
        assert_eq!(OutputParser::SingleLine.parse(" a\nb\r\nc \n"), "abc");
        assert_eq!(OutputParser::Str.parse("\n a\nb \n"), "a\nb");
    }

    #[tokio::test]
    async fn test_chain_formats_and_parses() {
        let model = Arc::new(ScriptedModel::answering(&["  about 62 years old \n"]));
        let chain = LlmChain::new(
            PromptTemplate::new("give me the age of below celebrity \n {{celeb}}"),
            model.clone(),
        );

        let answer = chain.invoke(&variables([("celeb", "Tom Cruise")])).await.unwrap();
        assert_eq!(answer, "about 62 years old");
        assert_eq!(
            model.prompt_texts(),
            vec!["give me the age of below celebrity \n Tom Cruise".to_string()]
        );
    }

    #[tokio::test]
    async fn test_chain_missing_variable_skips_model() {
        let model = Arc::new(ScriptedModel::answering(&["unused"]));
        let chain = LlmChain::new(PromptTemplate::new("{{query}}"), model.clone());

        let err = chain.invoke(&HashMap::new()).await.unwrap_err();
        assert!(matches!(err, ChainlabError::Template(_)));
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_or_degrade_never_fails() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let chain = LlmChain::new(PromptTemplate::new("{{query}}"), model)
            .with_parser(OutputParser::SingleLine);

        let missing = chain.invoke_or_degrade(&HashMap::new()).await;
        assert_eq!(missing.path, InvocationPath::Degraded);

        let failed = chain.invoke_or_degrade(&variables([("query", "hi")])).await;
        assert!(failed.text.starts_with("ERROR:"));
    }

    #[tokio::test]
    async fn test_invoke_or_degrade_parses_success() {
        let model = Arc::new(ScriptedModel::answering(&["line one\nline two"]));
        let chain = LlmChain::new(PromptTemplate::new("{{query}}"), model)
            .with_parser(OutputParser::SingleLine);

        let response = chain.invoke_or_degrade(&variables([("query", "hi")])).await;
        assert_eq!(response.path, InvocationPath::HighLevel);
        assert_eq!(response.text, "line oneline two");
    }
}
