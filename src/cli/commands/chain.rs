//! Chain command implementation.

use super::{connect, load_prompts};
use crate::chain::{LlmChain, PromptTemplate};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::llm::{init_llm, InitOptions};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Run the chain command.
pub async fn run_chain(
    input: &str,
    template: &str,
    vars: Vec<(String, String)>,
    fallback: bool,
    settings: Settings,
) -> Result<()> {
    let prompts = load_prompts(&settings)?;
    let Some(text) = prompts.named(template) else {
        anyhow::bail!(
            "Unknown template '{}'. Available: {}",
            template,
            Prompts::names().join(", ")
        );
    };
    let prompt = PromptTemplate::new(text).with_partials(&prompts.variables);
    let vars = chain_variables(&prompt, input, vars);

    let gateway = connect(&settings, Operation::Gateway)?;
    let model = init_llm(
        gateway,
        &settings.llm.model,
        InitOptions::from_settings(&settings)?,
    )
    .await?;
    let chain = LlmChain::new(prompt, Arc::new(model));

    let spinner = Output::spinner("Running chain...");
    if fallback {
        let response = chain.invoke_or_degrade(&vars).await;
        spinner.finish_and_clear();
        println!("\n{}\n", response.text);
        if response.is_degraded() {
            Output::warning("All invocation paths failed.");
        } else {
            Output::info(&format!("Answered via the {} path", response.path));
        }
        return Ok(());
    }

    let result = chain.invoke(&vars).await;
    spinner.finish_and_clear();
    match result {
        Ok(text) => println!("\n{}\n", text),
        Err(e) => {
            Output::error(&format!("Chain failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Explicit `--var` values, plus `input` bound to the first variable the
/// template still needs.
fn chain_variables(
    prompt: &PromptTemplate,
    input: &str,
    vars: Vec<(String, String)>,
) -> HashMap<String, String> {
    let mut values: HashMap<String, String> = vars.into_iter().collect();
    if let Some(name) = prompt
        .required_variables()
        .into_iter()
        .find(|v| !values.contains_key(*v))
    {
        values.insert(name.to_string(), input.to_string());
    }
    values
}
