//! Zero-shot ReAct loop.
//!
//! The model sees the tool list and a Thought/Action/Observation format,
//! writes one step at a time, and the runner executes the named tool and
//! appends its observation to the scratchpad until a final answer shows up.

use super::tools::{load_tools, Tool};
use crate::chain::{variables, PromptTemplate};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::gateway::Gateway;
use crate::llm::{init_llm, ChatModel, InitOptions};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, instrument, warn};

/// Text the model must stop generating at.
pub const STOP_SEQUENCE: &str = "\nObservation:";

/// Answer returned when the iteration limit is reached.
pub const FORCE_STOP_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

const FINAL_ANSWER: &str = "Final Answer:";

static ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("Invalid regex")
});
static ACTION_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)").expect("Invalid regex"));

/// One parsed model step.
#[derive(Debug, PartialEq)]
enum Step {
    Action { tool: String, input: String },
    Finish(String),
    Invalid(String),
}

fn parse_step(text: &str) -> Step {
    let has_answer = text.contains(FINAL_ANSWER);

    if let Some(caps) = ACTION.captures(text) {
        if has_answer {
            return Step::Invalid(format!(
                "Parsing LLM output produced both a final answer and a parse-able action: {}",
                text
            ));
        }
        return Step::Action {
            tool: caps[1].trim().to_string(),
            input: caps[2].trim_matches(' ').trim_matches('"').to_string(),
        };
    }

    if has_answer {
        let answer = text.rsplit(FINAL_ANSWER).next().unwrap_or_default();
        return Step::Finish(answer.trim().to_string());
    }

    if !ACTION_ONLY.is_match(text) {
        Step::Invalid("Invalid Format: Missing 'Action:' after 'Thought:'".to_string())
    } else {
        Step::Invalid("Invalid Format: Missing 'Action Input:' after 'Action:'".to_string())
    }
}

/// Tool-using agent.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    prompt: PromptTemplate,
    max_iterations: usize,
}

impl Agent {
    /// Create an agent; the prompt is assembled from the agent prompts and
    /// the tool list.
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Vec<Arc<dyn Tool>>,
        prompts: &Prompts,
    ) -> Result<Self> {
        let tool_names = tools.iter().map(|t| t.name()).collect::<Vec<_>>().join(", ");
        let tool_lines = tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n");

        let format_instructions = PromptTemplate::new(prompts.agent.format_instructions.clone())
            .with_partials(&prompts.variables)
            .format(&variables([("tool_names", tool_names.as_str())]))?;

        let template = [
            prompts.agent.prefix.as_str(),
            tool_lines.as_str(),
            format_instructions.as_str(),
            prompts.agent.suffix.as_str(),
        ]
        .join("\n\n");

        Ok(Self {
            model,
            tools,
            prompt: PromptTemplate::new(template).with_partials(&prompts.variables),
            max_iterations: 15,
        })
    }

    /// Agent with the model and tools configured in `[agent]`.
    pub async fn from_settings(settings: &Settings, gateway: Arc<Gateway>) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let model_name = settings.agent_model();
        let mut options = InitOptions::from_settings(settings)?;
        if model_name != settings.llm.model {
            // The [llm] deployment and provider belong to another model
            options.deployment_id = None;
            options.provider = None;
        }

        let base = init_llm(gateway, model_name, options).await?;
        let react = base.with_params(
            base.params()
                .clone()
                .with_stop(vec![STOP_SEQUENCE.to_string()]),
        );

        let tools = load_tools(&settings.agent, Arc::new(base), &prompts)?;
        Ok(Self::new(Arc::new(react), tools, &prompts)?
            .with_max_iterations(settings.agent.max_iterations))
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    /// Run the agent on a question.
    #[instrument(skip(self))]
    pub async fn run(&self, input: &str) -> Result<AgentResponse> {
        let mut scratchpad = String::new();
        let mut tool_calls = Vec::new();
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            debug!("Agent iteration {}", iterations);

            let prompt = self.prompt.format(&variables([
                ("input", input),
                ("agent_scratchpad", scratchpad.as_str()),
            ]))?;
            let output = self.model.invoke_text(&prompt).await?;
            let log = output.split(STOP_SEQUENCE).next().unwrap_or_default().trim_end();

            let observation = match parse_step(log) {
                Step::Finish(answer) => {
                    return Ok(AgentResponse {
                        content: answer,
                        tool_calls,
                        iterations,
                        stopped_early: false,
                    });
                }
                Step::Invalid(message) => {
                    warn!("Could not parse agent step: {}", message);
                    message
                }
                Step::Action { tool, input } => {
                    let record = self.execute_tool_call(&tool, &input).await;
                    let result = record.result.clone();
                    tool_calls.push(record);
                    result
                }
            };

            scratchpad.push_str(log);
            scratchpad.push_str(&format!("\nObservation: {}\nThought: ", observation));
        }

        info!("Agent stopped after {} iterations", iterations);
        Ok(AgentResponse {
            content: FORCE_STOP_MESSAGE.to_string(),
            tool_calls,
            iterations,
            stopped_early: true,
        })
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, name: &str, input: &str) -> ToolCallRecord {
        info!("Agent calling tool: {} with input: {}", name, input);

        let result = match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => match tool.run(input).await {
                Ok(output) => output,
                Err(e) => e.to_string(),
            },
            None => {
                let names = self.tools.iter().map(|t| t.name()).collect::<Vec<_>>();
                format!("{} is not a valid tool, try one of [{}].", name, names.join(", "))
            }
        };

        ToolCallRecord {
            name: name.to_string(),
            arguments: input.to_string(),
            result,
        }
    }
}

/// Response from an agent run.
#[derive(Debug, Serialize)]
pub struct AgentResponse {
    /// The final answer.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
    /// The iteration limit was hit before a final answer.
    pub stopped_early: bool,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// Input passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;
    use crate::error::ChainlabError;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeats its input."
        }

        async fn run(&self, input: &str) -> Result<String> {
            Ok(format!("echo: {}", input))
        }
    }

    struct Broken;

    #[async_trait]
    impl Tool for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails."
        }

        async fn run(&self, _input: &str) -> Result<String> {
            Err(ChainlabError::Tool("service down".to_string()))
        }
    }

    fn agent(model: Arc<ScriptedModel>) -> Agent {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(Echo), Arc::new(Broken)];
        Agent::new(model, tools, &Prompts::default()).unwrap()
    }

    #[test]
    fn test_parse_step() {
        assert_eq!(
            parse_step("I should search.\nAction: wikipedia\nAction Input: \"Crab Nebula\""),
            Step::Action {
                tool: "wikipedia".to_string(),
                input: "Crab Nebula".to_string()
            }
        );
        assert_eq!(
            parse_step("I now know the final answer\nFinal Answer: 6,500 light years"),
            Step::Finish("6,500 light years".to_string())
        );
        assert!(matches!(
            parse_step("Just musing"),
            Step::Invalid(m) if m.contains("Missing 'Action:'")
        ));
        assert!(matches!(
            parse_step("Action: echo"),
            Step::Invalid(m) if m.contains("Missing 'Action Input:'")
        ));
        assert!(matches!(
            parse_step("Action: echo\nAction Input: x\nFinal Answer: y"),
            Step::Invalid(m) if m.contains("both a final answer")
        ));
    }

    #[test]
    fn test_prompt_lists_tools() {
        let agent = agent(Arc::new(ScriptedModel::answering(&[])));
        let template = agent.prompt().template();

        assert!(template.starts_with("Answer the following questions as best you can."));
        assert!(template.contains("echo: Repeats its input.\nbroken: Always fails."));
        assert!(template.contains("should be one of [echo, broken]"));
        assert_eq!(agent.prompt().required_variables(), vec!["input", "agent_scratchpad"]);
    }

    #[tokio::test]
    async fn test_direct_final_answer() {
        let model = Arc::new(ScriptedModel::answering(&["I know this.\nFinal Answer: 42"]));
        let response = agent(model.clone()).run("What is six times seven?").await.unwrap();

        assert_eq!(response.content, "42");
        assert_eq!(response.iterations, 1);
        assert!(response.tool_calls.is_empty());
        assert!(!response.stopped_early);
        assert!(model.prompt_texts()[0].ends_with("Question: What is six times seven?\nThought:"));
    }

    #[tokio::test]
    async fn test_tool_observation_feeds_scratchpad() {
        let model = Arc::new(ScriptedModel::answering(&[
            " I should echo.\nAction: echo\nAction Input: \"hello\"\nObservation: made up",
            " I now know the final answer\nFinal Answer: hello back",
        ]));
        let response = agent(model.clone()).run("Say hello").await.unwrap();

        assert_eq!(response.content, "hello back");
        assert_eq!(response.iterations, 2);
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].to_string(), "echo(hello)");
        assert_eq!(response.tool_calls[0].result, "echo: hello");

        let second = &model.prompt_texts()[1];
        assert!(second.ends_with(
            "Thought: I should echo.\nAction: echo\nAction Input: \"hello\"\nObservation: echo: hello\nThought: "
        ));
        assert!(!second.contains("made up"));
    }

    #[tokio::test]
    async fn test_bad_steps_become_observations() {
        let model = Arc::new(ScriptedModel::answering(&[
            "Action: search\nAction Input: pulsars",
            "Action: broken\nAction Input: anything",
            "hmm",
            "Final Answer: gave up",
        ]));
        let response = agent(model.clone()).run("Anything").await.unwrap();

        assert_eq!(response.content, "gave up");
        assert_eq!(response.iterations, 4);
        assert_eq!(
            response.tool_calls[0].result,
            "search is not a valid tool, try one of [echo, broken]."
        );
        assert_eq!(response.tool_calls[1].result, "Tool error: service down");
        assert!(model.prompt_texts()[3]
            .contains("hmm\nObservation: Invalid Format: Missing 'Action:' after 'Thought:'"));
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let model = Arc::new(ScriptedModel::answering(&[
            "Action: echo\nAction Input: 1",
            "Action: echo\nAction Input: 2",
            "Action: echo\nAction Input: 3",
        ]));
        let response = agent(model.clone())
            .with_max_iterations(2)
            .run("Loop forever")
            .await
            .unwrap();

        assert!(response.stopped_early);
        assert_eq!(response.content, FORCE_STOP_MESSAGE);
        assert_eq!(response.iterations, 2);
        assert_eq!(model.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_model_errors_propagate() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        assert!(agent(model).run("Anything").await.is_err());
    }
}
