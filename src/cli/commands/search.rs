//! Search command implementation.

use super::connect;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::VideoAssistant;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    url: &str,
    query: &str,
    k: Option<usize>,
    settings: Settings,
) -> Result<()> {
    let k = k.unwrap_or(settings.retrieval.k);
    let gateway = connect(&settings, Operation::Video)?;
    let assistant = VideoAssistant::from_settings(&settings, gateway).await?;

    let spinner = Output::spinner("Indexing and searching...");
    let results = match assistant.create_index(url).await {
        Ok(index) => index.similarity_search(query, k).await,
        Err(e) => Err(e),
    };
    spinner.finish_and_clear();
    let results = results?;

    if results.is_empty() {
        Output::warning("No matching chunks found.");
        return Ok(());
    }

    Output::header(&format!("Found {} results for: \"{}\"", results.len(), query));
    for result in &results {
        Output::search_result(result);
    }
    println!();

    Ok(())
}
