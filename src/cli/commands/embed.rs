//! Embed command implementation.

use super::connect;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::llm::init_embedding_model;
use anyhow::Result;

/// Number of leading values printed.
const PREVIEW_VALUES: usize = 8;

/// Run the embed command.
pub async fn run_embed(text: &str, settings: Settings) -> Result<()> {
    let gateway = connect(&settings, Operation::Gateway)?;
    let embedder = init_embedding_model(gateway, &settings).await?;

    let spinner = Output::spinner(&format!("Embedding with {}...", settings.embedding.model));
    let embedding = embedder.embed(text).await;
    spinner.finish_and_clear();
    let embedding = embedding?;

    Output::header("Embedding");
    Output::kv("Model", &settings.embedding.model);
    Output::kv("Dimensions", &embedding.len().to_string());
    Output::kv("Norm", &format!("{:.4}", norm(&embedding)));
    Output::kv("Values", &preview(&embedding, PREVIEW_VALUES));

    Ok(())
}

fn norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

fn preview(values: &[f32], n: usize) -> String {
    let head = values
        .iter()
        .take(n)
        .map(|v| format!("{:.4}", v))
        .collect::<Vec<_>>()
        .join(", ");
    if values.len() > n {
        format!("[{}, ...]", head)
    } else {
        format!("[{}]", head)
    }
}
