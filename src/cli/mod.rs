//! CLI module for chainlab.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{format_duration, Output};

use clap::{Parser, Subcommand};

/// chainlab - chains, retrieval and agents over a model gateway
///
/// Run prompt chains, question-answer YouTube videos and drive a ReAct
/// agent with chat and embedding models deployed behind an AI Core style
/// gateway.
#[derive(Parser, Debug)]
#[command(name = "chainlab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "CHAINLAB_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check gateway access, external tools and configuration
    Doctor,

    /// List deployments registered with the gateway
    Deployments {
        /// Only show deployments of this model
        #[arg(short, long)]
        model: Option<String>,

        /// Include deployments that are not running
        #[arg(short, long)]
        all: bool,
    },

    /// Run a built-in prompt chain
    Chain {
        /// Value for the template's input variable
        #[arg(default_value = "What is a supernova?")]
        input: String,

        /// Template name (see `chainlab prompt`)
        #[arg(short, long, default_value = "step_by_step")]
        template: String,

        /// Extra template variables (key=value)
        #[arg(long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,

        /// Never fail; degrade through the fallback sequence
        #[arg(long)]
        fallback: bool,
    },

    /// List prompt templates or render one
    Prompt {
        /// Template name; lists templates when omitted
        name: Option<String>,

        /// Template variables (key=value)
        #[arg(long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,
    },

    /// Invoke a deployment through the fallback sequence
    Invoke {
        /// Prompt text
        prompt: String,

        /// Model name (defaults to llm.model)
        #[arg(short, long)]
        model: Option<String>,

        /// Deployment ID; skips registry lookup
        #[arg(short, long)]
        deployment: Option<String>,

        /// Provider override (openai, bedrock-invoke, bedrock-converse)
        #[arg(short, long)]
        provider: Option<String>,

        /// Skip the raw transport path
        #[arg(long)]
        no_direct: bool,
    },

    /// Embed a text with the configured embedding model
    Embed {
        /// Text to embed
        text: String,
    },

    /// Load, split and index a video's transcript
    Index {
        /// YouTube URL or video ID
        url: String,
    },

    /// Ask a question about a video
    Ask {
        /// YouTube URL or video ID
        url: String,

        /// The question to ask
        question: String,

        /// Number of transcript chunks to answer from
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Show the transcript chunks most similar to a query
    Search {
        /// YouTube URL or video ID
        url: String,

        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Answer a question with the ReAct agent (Wikipedia + calculator)
    Agent {
        /// The question for the agent
        question: String,

        /// Maximum reasoning steps
        #[arg(long)]
        max_iterations: Option<usize>,
    },

    /// Serve the YouTube assistant form
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    Ok((key.trim().to_string(), value.to_string()))
}
