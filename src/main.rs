//! chainlab CLI entry point.

use anyhow::Result;
use chainlab::cli::{commands, Cli, Commands};
use chainlab::config::Settings;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_ref()
        .map(|p| Settings::expand_path(p))
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("chainlab={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path).await?;
        }

        Commands::Deployments { model, all } => {
            commands::run_deployments(model.clone(), *all, settings).await?;
        }

        Commands::Chain { input, template, vars, fallback } => {
            commands::run_chain(input, template, vars.clone(), *fallback, settings).await?;
        }

        Commands::Prompt { name, vars } => {
            commands::run_prompt(name.as_deref(), vars.clone(), settings)?;
        }

        Commands::Invoke { prompt, model, deployment, provider, no_direct } => {
            commands::run_invoke(
                prompt,
                model.clone(),
                deployment.clone(),
                provider.clone(),
                *no_direct,
                settings,
            )
            .await?;
        }

        Commands::Embed { text } => {
            commands::run_embed(text, settings).await?;
        }

        Commands::Index { url } => {
            commands::run_index(url, settings).await?;
        }

        Commands::Ask { url, question, k } => {
            commands::run_ask(url, question, *k, settings).await?;
        }

        Commands::Search { url, query, k } => {
            commands::run_search(url, query, *k, settings).await?;
        }

        Commands::Agent { question, max_iterations } => {
            commands::run_agent(question, *max_iterations, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, &config_path)?;
        }
    }

    Ok(())
}
