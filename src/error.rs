//! Error types for chainlab.

use thiserror::Error;

/// Library-level error type for chainlab operations.
#[derive(Error, Debug)]
pub enum ChainlabError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No running deployment found for model: {0}")]
    DeploymentNotFound(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Prompt template error: {0}")]
    Template(String),

    #[error("Transcript error: {0}")]
    Transcript(String),

    #[error("No transcript found for the video: {0}")]
    EmptyTranscript(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for chainlab operations.
pub type Result<T> = std::result::Result<T, ChainlabError>;
