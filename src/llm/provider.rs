//! Provider families served by the gateway and their raw wire shapes.

use super::GenerationParams;
use crate::error::{ChainlabError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// `anthropic_version` sent with Bedrock invoke payloads.
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Output budget used when a provider requires one and none is configured.
pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// Temperature used on the raw payload path when none is configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// API family of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// OpenAI chat completions.
    OpenAi,
    /// Anthropic messages through Bedrock `invoke`.
    BedrockInvoke,
    /// Anthropic through the Bedrock `converse` API.
    BedrockConverse,
}

impl Provider {
    /// Guess the provider from a model name.
    pub fn detect(model_name: &str) -> Self {
        let name = model_name.to_lowercase();
        if name.starts_with("anthropic.") {
            Provider::BedrockInvoke
        } else if name.starts_with("anthropic--") || name.contains("claude") {
            Provider::BedrockConverse
        } else {
            Provider::OpenAi
        }
    }

    /// Path appended to the deployment URL.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Provider::OpenAi => "/chat/completions",
            Provider::BedrockInvoke => "/invoke",
            Provider::BedrockConverse => "/converse",
        }
    }

    /// Whether the endpoint takes an `api-version` query parameter.
    pub fn uses_api_version(&self) -> bool {
        matches!(self, Provider::OpenAi)
    }

    /// Build a single-turn payload directly, without typed request structs.
    pub fn direct_payload(&self, prompt: &str, params: &GenerationParams) -> Value {
        match self {
            Provider::OpenAi => {
                let mut body = Map::new();
                body.insert(
                    "messages".to_string(),
                    json!([{ "role": "user", "content": prompt }]),
                );
                if let Some(max_tokens) = params.max_tokens {
                    body.insert("max_tokens".to_string(), json!(max_tokens));
                }
                if let Some(temperature) = params.temperature {
                    body.insert("temperature".to_string(), json!(temperature));
                }
                if let Some(stop) = &params.stop {
                    body.insert("stop".to_string(), json!(stop));
                }
                Value::Object(body)
            }
            Provider::BedrockInvoke => {
                let mut body = json!({
                    "messages": [{ "role": "user", "content": prompt }],
                    "max_tokens": params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                    "temperature": params.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                    "anthropic_version": ANTHROPIC_VERSION,
                });
                if let Some(stop) = &params.stop {
                    body["stop_sequences"] = json!(stop);
                }
                body
            }
            Provider::BedrockConverse => {
                let mut config = json!({
                    "maxTokens": params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                    "temperature": params.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                });
                if let Some(stop) = &params.stop {
                    config["stopSequences"] = json!(stop);
                }
                json!({
                    "messages": [{ "role": "user", "content": [{ "text": prompt }] }],
                    "inferenceConfig": config,
                })
            }
        }
    }

    /// Pull the generated text out of a raw provider response.
    pub fn extract_text(&self, response: &Value) -> Result<String> {
        let pointer = match self {
            Provider::OpenAi => "/choices/0/message/content",
            Provider::BedrockInvoke => "/content/0/text",
            Provider::BedrockConverse => "/output/message/content/0/text",
        };

        response
            .pointer(pointer)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ChainlabError::MalformedResponse(format!(
                    "{} response has no text at {}",
                    self, pointer
                ))
            })
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::BedrockInvoke => write!(f, "bedrock-invoke"),
            Provider::BedrockConverse => write!(f, "bedrock-converse"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "bedrock-invoke" | "invoke" => Ok(Provider::BedrockInvoke),
            "bedrock-converse" | "converse" => Ok(Provider::BedrockConverse),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}
