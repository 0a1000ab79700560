//! Configuration settings for chainlab.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub gateway: GatewaySettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub splitter: SplitterSettings,
    pub retrieval: RetrievalSettings,
    pub youtube: YoutubeSettings,
    pub agent: AgentSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Model gateway connection settings.
///
/// Every field can be overridden through the `AICORE_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Base URL of the gateway API (e.g. `https://api.ai.example.com`).
    pub base_url: String,
    /// OAuth server URL used for the client-credentials exchange.
    pub auth_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Pre-issued bearer token. Takes precedence over client credentials.
    pub token: Option<String>,
    /// Resource group sent as `AI-Resource-Group` on every request.
    pub resource_group: String,
    /// API version appended to OpenAI-family inference calls.
    pub api_version: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            auth_url: None,
            client_id: None,
            client_secret: None,
            token: None,
            resource_group: "default".to_string(),
            api_version: "2024-02-01".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Model name as registered with the gateway.
    pub model: String,
    /// Explicit deployment ID (skips registry lookup).
    pub deployment_id: Option<String>,
    /// Provider override (openai, bedrock-invoke, bedrock-converse).
    pub provider: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Route chain calls through the fallback invocation sequence.
    pub fallback: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            deployment_id: None,
            provider: None,
            max_tokens: Some(300),
            temperature: None,
            fallback: false,
        }
    }
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model name.
    pub model: String,
    /// Explicit deployment ID (skips registry lookup).
    pub deployment_id: Option<String>,
    /// Requested dimensions. Leave unset for models that don't support it.
    pub dimensions: Option<u32>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            deployment_id: None,
            dimensions: None,
        }
    }
}

/// Transcript splitting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterSettings {
    /// Splitting strategy (recursive, temporal).
    pub strategy: String,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
    /// Window length for the temporal strategy.
    pub target_chunk_seconds: u32,
}

impl Default for SplitterSettings {
    fn default() -> Self {
        Self {
            strategy: "recursive".to_string(),
            chunk_size: 1000,
            chunk_overlap: 100,
            target_chunk_seconds: 180,
        }
    }
}

/// Similarity search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of chunks to retrieve per question.
    pub k: usize,
    /// Minimum similarity score.
    pub min_score: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            k: 4,
            min_score: 0.0,
        }
    }
}

/// YouTube transcript settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// Preferred caption languages, in order.
    pub languages: Vec<String>,
    /// Path or name of the yt-dlp binary.
    pub ytdlp_path: String,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

/// Agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Model override for the agent (defaults to `llm.model`).
    pub model: Option<String>,
    pub max_iterations: usize,
    /// Enabled tools (wikipedia, llm-math).
    pub tools: Vec<String>,
    /// Wikipedia language edition.
    pub wikipedia_lang: String,
    /// Number of Wikipedia pages to summarize per lookup.
    pub wikipedia_top_k: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: None,
            max_iterations: 15,
            tools: vec!["wikipedia".to_string(), "llm-math".to_string()],
            wikipedia_lang: "en".to_string(),
            wikipedia_top_k: 3,
        }
    }
}

/// Web form server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// `maxlength` of the form's text inputs.
    pub max_input_chars: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            max_input_chars: 50,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Gateway environment variables are applied on top of the file.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Override gateway settings from the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = lookup("AICORE_BASE_URL") {
            self.gateway.base_url = v;
        }
        if let Some(v) = lookup("AICORE_AUTH_URL") {
            self.gateway.auth_url = Some(v);
        }
        if let Some(v) = lookup("AICORE_CLIENT_ID") {
            self.gateway.client_id = Some(v);
        }
        if let Some(v) = lookup("AICORE_CLIENT_SECRET") {
            self.gateway.client_secret = Some(v);
        }
        if let Some(v) = lookup("AICORE_RESOURCE_GROUP") {
            self.gateway.resource_group = v;
        }
        if let Some(v) = lookup("AICORE_TOKEN") {
            self.gateway.token = Some(v);
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ChainlabError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chainlab")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Model used by the agent.
    pub fn agent_model(&self) -> &str {
        self.agent.model.as_deref().unwrap_or(&self.llm.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_video_pipeline() {
        let settings = Settings::default();
        assert_eq!(settings.llm.model, "gpt-4o");
        assert_eq!(settings.embedding.model, "text-embedding-ada-002");
        assert_eq!(settings.splitter.chunk_size, 1000);
        assert_eq!(settings.splitter.chunk_overlap, 100);
        assert_eq!(settings.retrieval.k, 4);
        assert_eq!(settings.agent.max_iterations, 15);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm]\nmodel = \"anthropic--claude-4-sonnet\"\n").unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.llm.model, "anthropic--claude-4-sonnet");
        assert_eq!(settings.llm.max_tokens, Some(300));
        assert_eq!(settings.gateway.resource_group, "default");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.retrieval.k = 7;
        settings.save_to(&path).unwrap();

        let reloaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(reloaded.retrieval.k, 7);
    }

    #[test]
    fn test_env_overrides_gateway() {
        let env: HashMap<&str, &str> = [
            ("AICORE_BASE_URL", "https://gw.example.com"),
            ("AICORE_RESOURCE_GROUP", "research"),
            ("AICORE_TOKEN", ""),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(settings.gateway.base_url, "https://gw.example.com");
        assert_eq!(settings.gateway.resource_group, "research");
        // Empty values are ignored
        assert!(settings.gateway.token.is_none());
    }
}
