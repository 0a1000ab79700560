//! Invoke command implementation.

use super::connect;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::fallback::invoke_with_fallback;
use crate::llm::{init_llm, InitOptions, Provider};
use anyhow::Result;

/// Run the invoke command.
pub async fn run_invoke(
    prompt: &str,
    model: Option<String>,
    deployment: Option<String>,
    provider: Option<String>,
    no_direct: bool,
    settings: Settings,
) -> Result<()> {
    let model = model.unwrap_or_else(|| settings.llm.model.clone());
    let mut options = InitOptions::from_settings(&settings)?;
    if model != settings.llm.model {
        options.deployment_id = None;
        options.provider = None;
    }
    if deployment.is_some() {
        options.deployment_id = deployment;
    }
    if let Some(provider) = provider {
        options.provider = Some(provider.parse::<Provider>().map_err(anyhow::Error::msg)?);
    }

    let gateway = connect(&settings, Operation::Gateway)?;
    let mut chat = init_llm(gateway, &model, options).await?;
    if no_direct {
        chat = chat.without_direct_access();
    }

    let spinner = Output::spinner(&format!("Invoking {}...", model));
    let response = invoke_with_fallback(&chat, prompt).await;
    spinner.finish_and_clear();

    println!("\n{}\n", response.text);
    Output::kv("Deployment", &chat.deployment().id);
    Output::kv("Path", &response.path.to_string());
    if response.is_degraded() {
        Output::warning("Both invocation paths failed; showing the error text.");
    }

    Ok(())
}
