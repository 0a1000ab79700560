//! Ask command implementation.

use super::connect;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::VideoAssistant;
use crate::web::{wrap_text, WRAP_WIDTH};
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    url: &str,
    question: &str,
    k: Option<usize>,
    settings: Settings,
) -> Result<()> {
    let k = k.unwrap_or(settings.retrieval.k);
    let gateway = connect(&settings, Operation::Video)?;
    let assistant = VideoAssistant::from_settings(&settings, gateway).await?;

    let spinner = Output::spinner("Thinking...");
    let answer = assistant.ask(url, question, k).await;
    spinner.finish_and_clear();
    let answer = answer?;

    println!("\n{}\n", wrap_text(&answer.answer, WRAP_WIDTH));

    if !answer.sources.is_empty() {
        Output::header("Sources");
        for source in &answer.sources {
            Output::search_result(source);
        }
        println!();
    }

    if let Some(path) = answer.path {
        Output::kv("Path", &path.to_string());
    }

    Ok(())
}
