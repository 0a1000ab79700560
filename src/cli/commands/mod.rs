//! CLI command implementations.

mod agent;
mod ask;
mod chain;
mod config;
mod deployments;
mod doctor;
mod embed;
mod index;
mod invoke;
mod prompt;
mod search;
mod serve;

pub use agent::run_agent;
pub use ask::run_ask;
pub use chain::run_chain;
pub use config::run_config;
pub use deployments::run_deployments;
pub use doctor::run_doctor;
pub use embed::run_embed;
pub use index::run_index;
pub use invoke::run_invoke;
pub use prompt::run_prompt;
pub use search::run_search;
pub use serve::run_serve;

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::gateway::Gateway;
use std::sync::Arc;

/// Gateway client for commands that call models, after pre-flight checks.
fn connect(settings: &Settings, operation: Operation) -> anyhow::Result<Arc<Gateway>> {
    if let Err(e) = preflight::check(operation, settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'chainlab doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    Ok(Arc::new(Gateway::new(&settings.gateway)?))
}

fn load_prompts(settings: &Settings) -> anyhow::Result<Prompts> {
    Ok(Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?)
}
