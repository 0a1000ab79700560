//! Index command implementation.

use super::connect;
use crate::cli::preflight::Operation;
use crate::cli::{format_duration, Output};
use crate::config::Settings;
use crate::rag::VideoAssistant;
use anyhow::Result;

/// Run the index command.
pub async fn run_index(url: &str, settings: Settings) -> Result<()> {
    let gateway = connect(&settings, Operation::Video)?;
    let assistant = VideoAssistant::from_settings(&settings, gateway).await?;

    let spinner = Output::spinner("Loading and indexing transcript...");
    let index = assistant.create_index(url).await;
    spinner.finish_and_clear();
    let index = index?;

    Output::success(&format!("Indexed: {}", index.title()));
    Output::kv("Video ID", index.video_id());
    Output::kv("Chunks", &index.chunk_count().to_string());

    let mut documents = index.documents().await?;
    documents.sort_by_key(|d| d.chunk_order);
    let duration = documents.iter().map(|d| d.end_seconds).fold(0.0f64, f64::max);
    Output::kv("Duration", &format_duration(duration));

    println!();
    for document in &documents {
        let preview: String = document.content.replace('\n', " ").chars().take(80).collect();
        Output::list_item(&format!("[{}] {}", document.format_timestamp(), preview));
    }

    Ok(())
}
