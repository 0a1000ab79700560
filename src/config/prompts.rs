//! Prompt templates for chainlab.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub chains: ChainPrompts,
    pub video: VideoPrompts,
    pub agent: AgentPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the standalone chains.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainPrompts {
    pub step_by_step: String,
    pub celebrity_age: String,
}

impl Default for ChainPrompts {
    fn default() -> Self {
        Self {
            step_by_step: "Question: {{query}}\nAnswer: Let's think step by step.".to_string(),
            celebrity_age: "give me the age of below celebrity \n {{celeb}}".to_string(),
        }
    }
}

/// Prompts for video question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoPrompts {
    pub qa: String,
}

impl Default for VideoPrompts {
    fn default() -> Self {
        Self {
            qa: r#"You are a helpful assistant that can answer questions about youtube videos
based on the video's transcript.

Answer the following question: {{question}}
By searching the following video transcript: {{docs}}

Only use the factual information from the transcript to answer the question.

If you feel like you don't have enough information to answer the question, say "I don't know".

Your answers should be verbose and detailed."#
                .to_string(),
        }
    }
}

/// Prompts for the ReAct agent and its calculator tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub prefix: String,
    pub format_instructions: String,
    pub suffix: String,
    pub math: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            prefix: "Answer the following questions as best you can. You have access to the following tools:".to_string(),

            format_instructions: r#"Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{{tool_names}}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question"#
                .to_string(),

            suffix: "Begin!\n\nQuestion: {{input}}\nThought:{{agent_scratchpad}}".to_string(),

            math: r#"Translate a math problem into a single arithmetic expression that a calculator can evaluate.
The calculator understands numbers, + - * / % ^, parentheses, the functions sqrt, abs, ln, log, exp, sin, cos, tan, floor, ceil, round, and the constants pi and e.

Use the following format:

Question: ${Question with math problem.}
```text
${single line mathematical expression that solves the problem}
```

Begin.

Question: What is 37593 * 67?
```text
37593 * 67
```

Question: What is the square root of 2 raised to the 3rd power?
```text
sqrt(2) ^ 3
```

Question: {{question}}
"#
            .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let chains_path = custom_path.join("chains.toml");
            if chains_path.exists() {
                let content = std::fs::read_to_string(&chains_path)?;
                prompts.chains = toml::from_str(&content)?;
            }

            let video_path = custom_path.join("video.toml");
            if video_path.exists() {
                let content = std::fs::read_to_string(&video_path)?;
                prompts.video = toml::from_str(&content)?;
            }

            let agent_path = custom_path.join("agent.toml");
            if agent_path.exists() {
                let content = std::fs::read_to_string(&agent_path)?;
                prompts.agent = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Look up a named template (`step_by_step`, `celebrity_age`, `video_qa`, `math`).
    pub fn named(&self, name: &str) -> Option<&str> {
        match name {
            "step_by_step" => Some(&self.chains.step_by_step),
            "celebrity_age" => Some(&self.chains.celebrity_age),
            "video_qa" => Some(&self.video.qa),
            "math" => Some(&self.agent.math),
            _ => None,
        }
    }

    /// Names accepted by [`Prompts::named`].
    pub fn names() -> &'static [&'static str] {
        &["step_by_step", "celebrity_age", "video_qa", "math"]
    }
}
