//! Typed request and response bodies for Anthropic models on Bedrock.

use super::{ChatMessage, GenerationParams, Role, ANTHROPIC_VERSION, DEFAULT_MAX_TOKENS};
use serde::{Deserialize, Serialize};

/// Bedrock `invoke` request for Anthropic messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    pub anthropic_version: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default)]
    pub messages: Vec<InvokeMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct InvokeResponse {
    #[serde(default)]
    pub content: Vec<InvokeContent>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InvokeContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl InvokeRequest {
    /// Request template without messages.
    pub fn template(params: &GenerationParams) -> Self {
        Self {
            anthropic_version: ANTHROPIC_VERSION.to_string(),
            max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: params.temperature,
            stop_sequences: params.stop.clone(),
            system: None,
            messages: Vec::new(),
        }
    }

    /// Split system messages into the top-level `system` field.
    pub fn set_messages(&mut self, messages: &[ChatMessage]) {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        self.system = (!system.is_empty()).then(|| system.join("\n\n"));

        self.messages = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| InvokeMessage {
                role: role_name(m.role).to_string(),
                content: m.content.clone(),
            })
            .collect();
    }
}

impl InvokeResponse {
    /// Concatenated text blocks.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter(|c| c.kind.is_empty() || c.kind == "text")
            .filter_map(|c| c.text.as_deref())
            .collect();
        (!parts.is_empty()).then(|| parts.concat())
    }
}

/// Bedrock `converse` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverseRequest {
    #[serde(default)]
    pub messages: Vec<ConverseMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Vec<ContentBlock>>,
    pub inference_config: InferenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverseMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ConverseResponse {
    pub output: ConverseOutput,
}

#[derive(Debug, Deserialize)]
pub struct ConverseOutput {
    pub message: ConverseMessage,
}

impl ConverseRequest {
    /// Request template without messages.
    pub fn template(params: &GenerationParams) -> Self {
        Self {
            messages: Vec::new(),
            system: None,
            inference_config: InferenceConfig {
                max_tokens: params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                temperature: params.temperature,
                stop_sequences: params.stop.clone(),
            },
        }
    }

    pub fn set_messages(&mut self, messages: &[ChatMessage]) {
        let system: Vec<ContentBlock> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| ContentBlock {
                text: Some(m.content.clone()),
            })
            .collect();
        self.system = (!system.is_empty()).then_some(system);

        self.messages = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| ConverseMessage {
                role: role_name(m.role).to_string(),
                content: vec![ContentBlock {
                    text: Some(m.content.clone()),
                }],
            })
            .collect();
    }
}

impl ConverseResponse {
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .output
            .message
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect();
        (!parts.is_empty()).then(|| parts.concat())
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_system_split() {
        let mut request = InvokeRequest::template(&GenerationParams::default());
        request.set_messages(&[
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
        ]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["system"], "be brief");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["max_tokens"], 300);
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_converse_camel_case() {
        let params = GenerationParams {
            max_tokens: Some(10),
            temperature: Some(0.2),
            stop: None,
        };
        let mut request = ConverseRequest::template(&params);
        request.set_messages(&[ChatMessage::user("hello")]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["inferenceConfig"]["maxTokens"], 10);
        assert_eq!(json["messages"][0]["content"][0]["text"], "hello");
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_response_text() {
        let invoke: InvokeResponse = serde_json::from_value(serde_json::json!({
            "content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(invoke.text().as_deref(), Some("ab"));

        let converse: ConverseResponse = serde_json::from_value(serde_json::json!({
            "output": {"message": {"role": "assistant", "content": [{"text": "c"}]}}
        }))
        .unwrap();
        assert_eq!(converse.text().as_deref(), Some("c"));
    }
}
