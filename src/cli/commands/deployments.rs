//! Deployments command implementation.

use super::connect;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use crate::gateway::{Deployment, DeploymentRegistry};
use anyhow::Result;

/// Run the deployments command.
pub async fn run_deployments(model: Option<String>, all: bool, settings: Settings) -> Result<()> {
    let gateway = connect(&settings, Operation::Gateway)?;
    let registry = DeploymentRegistry::new(gateway);

    let spinner = Output::spinner("Querying deployment registry...");
    let deployments = registry.list().await;
    spinner.finish_and_clear();

    let deployments = filter_deployments(deployments?, model.as_deref(), all);
    if deployments.is_empty() {
        Output::warning("No matching deployments found.");
        if !all {
            Output::info("Use --all to include deployments that are not running.");
        }
        return Ok(());
    }

    Output::header(&format!("Deployments ({})", deployments.len()));
    for deployment in &deployments {
        Output::deployment(deployment);
    }
    println!();

    Ok(())
}

fn filter_deployments(
    deployments: Vec<Deployment>,
    model: Option<&str>,
    all: bool,
) -> Vec<Deployment> {
    let mut deployments: Vec<Deployment> = deployments
        .into_iter()
        .filter(|d| all || d.is_running())
        .filter(|d| model.map_or(true, |m| d.model_name == m))
        .collect();
    deployments.sort_by(|a, b| a.model_name.cmp(&b.model_name).then_with(|| a.id.cmp(&b.id)));
    deployments
}
