//! Configuration module for chainlab.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, ChainPrompts, Prompts, VideoPrompts};
pub use settings::{
    AgentSettings, EmbeddingSettings, GatewaySettings, GeneralSettings, LlmSettings,
    PromptSettings, RetrievalSettings, ServerSettings, Settings, SplitterSettings,
    YoutubeSettings,
};
