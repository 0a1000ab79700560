//! Prompt command implementation.

use super::load_prompts;
use crate::chain::PromptTemplate;
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use anyhow::Result;
use std::collections::HashMap;

/// Run the prompt command.
pub fn run_prompt(
    name: Option<&str>,
    vars: Vec<(String, String)>,
    settings: Settings,
) -> Result<()> {
    let prompts = load_prompts(&settings)?;

    let Some(name) = name else {
        Output::header("Prompt templates");
        for name in Prompts::names() {
            let template = prompts
                .named(name)
                .map(|t| PromptTemplate::new(t).with_partials(&prompts.variables));
            let required = template
                .as_ref()
                .map(|t| t.required_variables().join(", "))
                .unwrap_or_default();
            Output::kv(name, &format!("[{}]", required));
        }
        if let Some(dir) = &settings.prompts.custom_dir {
            println!();
            Output::info(&format!("Overrides are read from {}", dir));
        }
        return Ok(());
    };

    let Some(text) = prompts.named(name) else {
        anyhow::bail!(
            "Unknown template '{}'. Available: {}",
            name,
            Prompts::names().join(", ")
        );
    };

    if vars.is_empty() {
        println!("{}", text);
        return Ok(());
    }

    let template = PromptTemplate::new(text).with_partials(&prompts.variables);
    let vars: HashMap<String, String> = vars.into_iter().collect();
    println!("{}", template.format(&vars)?);
    Ok(())
}
