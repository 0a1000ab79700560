//! Tools available to the agent.

use super::math;
use crate::chain::{variables, LlmChain, PromptTemplate};
use crate::config::{AgentSettings, Prompts};
use crate::error::{ChainlabError, Result};
use crate::llm::ChatModel;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::{debug, instrument};

/// Maximum characters returned by a Wikipedia lookup.
pub const WIKIPEDIA_MAX_CHARS: usize = 4000;

/// A named capability the agent can call with a text input.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses in `Action:` lines.
    fn name(&self) -> &str;

    /// One-line description shown in the agent prompt.
    fn description(&self) -> &str;

    async fn run(&self, input: &str) -> Result<String>;
}

/// Build the tools named in settings.
pub fn load_tools(
    settings: &AgentSettings,
    model: Arc<dyn ChatModel>,
    prompts: &Prompts,
) -> Result<Vec<Arc<dyn Tool>>> {
    settings
        .tools
        .iter()
        .map(|name| -> Result<Arc<dyn Tool>> {
            match name.to_lowercase().as_str() {
                "wikipedia" => Ok(Arc::new(WikipediaTool::new(
                    &settings.wikipedia_lang,
                    settings.wikipedia_top_k,
                ))),
                "llm-math" | "calculator" => {
                    Ok(Arc::new(CalculatorTool::new(model.clone(), prompts)))
                }
                other => Err(ChainlabError::Config(format!("Unknown agent tool: {}", other))),
            }
        })
        .collect()
}

/// Searches Wikipedia and returns page summaries.
pub struct WikipediaTool {
    http: reqwest::Client,
    api_url: String,
    top_k: usize,
}

impl WikipediaTool {
    pub fn new(lang: &str, top_k: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: format!("https://{}.wikipedia.org/w/api.php", lang),
            top_k: top_k.max(1),
        }
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http
            .get(&self.api_url)
            .query(&[("action", "query"), ("format", "json")])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChainlabError::Tool(format!(
                "Wikipedia returned status {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>> {
        let limit = self.top_k.to_string();
        let json = self
            .query(&[("list", "search"), ("srsearch", query), ("srlimit", &limit)])
            .await?;
        Ok(search_titles(&json))
    }

    async fn summary(&self, title: &str) -> Result<Option<String>> {
        let json = self
            .query(&[
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;
        Ok(page_extract(&json))
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "A wrapper around Wikipedia. Useful for when you need to answer general questions about \
         people, places, companies, facts, historical events, or other subjects. \
         Input should be a search query."
    }

    #[instrument(skip(self))]
    async fn run(&self, input: &str) -> Result<String> {
        let titles = self.search_titles(input.trim()).await?;
        debug!("Wikipedia titles: {:?}", titles);

        let mut pages = Vec::new();
        for title in titles {
            if let Some(summary) = self.summary(&title).await? {
                pages.push(format!("Page: {}\nSummary: {}", title, summary));
            }
        }

        if pages.is_empty() {
            return Ok("No good Wikipedia Search Result was found".to_string());
        }
        Ok(truncate_chars(&pages.join("\n\n"), WIKIPEDIA_MAX_CHARS))
    }
}

fn search_titles(json: &Value) -> Vec<String> {
    json["query"]["search"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|hit| hit["title"].as_str().map(|t| t.to_string()))
        .collect()
}

fn page_extract(json: &Value) -> Option<String> {
    json["query"]["pages"]
        .as_object()?
        .values()
        .filter_map(|page| page["extract"].as_str())
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

static TEXT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```text\s*(.*?)\s*```").expect("Invalid regex"));

/// Answers math questions by having the model write an expression and
/// evaluating it locally.
pub struct CalculatorTool {
    chain: LlmChain,
}

impl CalculatorTool {
    pub fn new(model: Arc<dyn ChatModel>, prompts: &Prompts) -> Self {
        let prompt =
            PromptTemplate::new(prompts.agent.math.clone()).with_partials(&prompts.variables);
        Self {
            chain: LlmChain::new(prompt, model),
        }
    }
}

/// Turn the model's reply into a calculator answer.
fn answer_from_reply(reply: &str) -> Result<String> {
    if let Some(caps) = TEXT_BLOCK.captures(reply) {
        let expression = caps[1].trim();
        let value = math::evaluate(expression)?;
        return Ok(format!("Answer: {}", math::format_number(value)));
    }

    let reply = reply.trim();
    if reply.starts_with("Answer:") {
        return Ok(reply.to_string());
    }
    if let Some((_, answer)) = reply.split_once("Answer:") {
        return Ok(format!("Answer: {}", answer.trim()));
    }

    Err(ChainlabError::Tool(format!("unknown format from LLM: {}", reply)))
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "Calculator"
    }

    fn description(&self) -> &str {
        "Useful for when you need to answer questions about math."
    }

    #[instrument(skip(self))]
    async fn run(&self, input: &str) -> Result<String> {
        let reply = self.chain.invoke(&variables([("question", input)])).await?;
        debug!("Calculator reply: {}", reply);
        answer_from_reply(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;
    use serde_json::json;

    #[test]
    fn test_answer_from_reply() {
        assert_eq!(
            answer_from_reply("```text\n13.8e9 * 3\n```").unwrap(),
            "Answer: 41400000000"
        );
        assert_eq!(answer_from_reply("Answer: 42").unwrap(), "Answer: 42");
        assert!(answer_from_reply("no idea").is_err());
        assert!(answer_from_reply("```text\n2 +\n```").is_err());
    }

    #[tokio::test]
    async fn test_calculator_runs_expression() {
        let model = Arc::new(ScriptedModel::answering(&["```text\n37593 * 67\n```"]));
        let tool = CalculatorTool::new(model.clone(), &Prompts::default());

        assert_eq!(tool.run("What is 37593 * 67?").await.unwrap(), "Answer: 2518731");
        assert!(model.prompt_texts()[0].ends_with("Question: What is 37593 * 67?\n"));
    }

    #[test]
    fn test_wikipedia_parsing() {
        let search = json!({ "query": { "search": [{ "title": "Supernova" }, { "title": "SN 1987A" }] } });
        assert_eq!(search_titles(&search), vec!["Supernova", "SN 1987A"]);
        assert!(search_titles(&json!({})).is_empty());

        let pages = json!({ "query": { "pages": { "123": { "title": "Supernova", "extract": " A supernova is... " } } } });
        assert_eq!(page_extract(&pages).as_deref(), Some("A supernova is..."));
        assert_eq!(page_extract(&json!({ "query": { "pages": { "-1": {} } } })), None);

        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn test_load_tools() {
        let model: Arc<dyn ChatModel> = Arc::new(ScriptedModel::answering(&[]));
        let prompts = Prompts::default();
        let tools = load_tools(&AgentSettings::default(), model.clone(), &prompts).unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["wikipedia", "Calculator"]);

        let settings = AgentSettings {
            tools: vec!["serpapi".to_string()],
            ..Default::default()
        };
        assert!(load_tools(&settings, model, &prompts).is_err());
    }
}
