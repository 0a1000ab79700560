//! Chat model client for gateway deployments.

use super::bedrock::{ConverseRequest, ConverseResponse, InvokeRequest, InvokeResponse};
use super::{
    ChatMessage, ChatModel, DirectAccess, GenerationParams, Provider, Role, SerializationCache,
};
use crate::error::{ChainlabError, Result};
use crate::gateway::{Deployment, Transport};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    Stop,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Chat model bound to a gateway deployment.
pub struct GatewayChat {
    deployment: Deployment,
    provider: Provider,
    params: GenerationParams,
    transport: Arc<dyn Transport>,
    api_version: String,
    expose_transport: bool,
    serialized: SerializationCache,
}

impl GatewayChat {
    /// Create a chat client for a deployment.
    pub fn new(
        deployment: Deployment,
        provider: Provider,
        params: GenerationParams,
        transport: Arc<dyn Transport>,
        api_version: &str,
    ) -> Self {
        Self {
            deployment,
            provider,
            params,
            transport,
            api_version: api_version.to_string(),
            expose_transport: true,
            serialized: SerializationCache::default(),
        }
    }

    /// Hide the raw transport from [`ChatModel::direct_access`].
    pub fn without_direct_access(mut self) -> Self {
        self.expose_transport = false;
        self
    }

    /// A client for the same deployment with other generation parameters.
    pub fn with_params(&self, params: GenerationParams) -> Self {
        Self {
            deployment: self.deployment.clone(),
            provider: self.provider,
            params,
            transport: self.transport.clone(),
            api_version: self.api_version.clone(),
            expose_transport: self.expose_transport,
            serialized: SerializationCache::default(),
        }
    }

    /// Deployment this client talks to.
    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    fn url(&self) -> String {
        format!(
            "{}{}",
            self.deployment.deployment_url.trim_end_matches('/'),
            self.provider.endpoint_path()
        )
    }

    fn query(&self) -> Vec<(&str, &str)> {
        if self.provider.uses_api_version() {
            vec![("api-version", self.api_version.as_str())]
        } else {
            Vec::new()
        }
    }

    /// Serialized request without messages.
    fn build_template(&self) -> Result<Value> {
        let value = match self.provider {
            Provider::OpenAi => serde_json::to_value(self.openai_template()?)?,
            Provider::BedrockInvoke => serde_json::to_value(InvokeRequest::template(&self.params))?,
            Provider::BedrockConverse => {
                serde_json::to_value(ConverseRequest::template(&self.params))?
            }
        };
        Ok(value)
    }

    #[allow(deprecated)]
    fn openai_template(&self) -> Result<CreateChatCompletionRequest> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.deployment.model_name);
        if let Some(max_tokens) = self.params.max_tokens {
            args.max_tokens(max_tokens);
        }
        if let Some(temperature) = self.params.temperature {
            args.temperature(temperature);
        }
        if let Some(stop) = &self.params.stop {
            args.stop(Stop::StringArray(stop.clone()));
        }
        args.build()
            .map_err(|e| ChainlabError::InvalidInput(format!("Failed to build request: {}", e)))
    }

    fn request_template(&self) -> Result<Value> {
        // Build eagerly so errors surface instead of being cached.
        let fresh = self.build_template()?;
        Ok(self.serialized.get_or_insert_with(|| fresh))
    }

    fn openai_messages(messages: &[ChatMessage]) -> Result<Vec<ChatCompletionRequestMessage>> {
        messages
            .iter()
            .map(|m| {
                let message: ChatCompletionRequestMessage = match m.role {
                    Role::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(|e| ChainlabError::InvalidInput(e.to_string()))?
                        .into(),
                    Role::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(|e| ChainlabError::InvalidInput(e.to_string()))?
                        .into(),
                    Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(|e| ChainlabError::InvalidInput(e.to_string()))?
                        .into(),
                };
                Ok(message)
            })
            .collect()
    }

    fn build_body(&self, template: Value, messages: &[ChatMessage]) -> Result<Value> {
        let body = match self.provider {
            Provider::OpenAi => {
                let mut body = template;
                body["messages"] = serde_json::to_value(Self::openai_messages(messages)?)?;
                body
            }
            Provider::BedrockInvoke => {
                let mut request: InvokeRequest = serde_json::from_value(template)?;
                request.set_messages(messages);
                serde_json::to_value(request)?
            }
            Provider::BedrockConverse => {
                let mut request: ConverseRequest = serde_json::from_value(template)?;
                request.set_messages(messages);
                serde_json::to_value(request)?
            }
        };
        Ok(body)
    }

    fn parse_response(&self, response: Value) -> Result<String> {
        let text = match self.provider {
            Provider::OpenAi => {
                let response: CreateChatCompletionResponse = serde_json::from_value(response)
                    .map_err(|e| ChainlabError::MalformedResponse(e.to_string()))?;
                response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
            }
            Provider::BedrockInvoke => {
                let response: InvokeResponse = serde_json::from_value(response)
                    .map_err(|e| ChainlabError::MalformedResponse(e.to_string()))?;
                debug!("Stop reason: {:?}", response.stop_reason);
                response.text()
            }
            Provider::BedrockConverse => {
                let response: ConverseResponse = serde_json::from_value(response)
                    .map_err(|e| ChainlabError::MalformedResponse(e.to_string()))?;
                response.text()
            }
        };

        text.ok_or_else(|| {
            ChainlabError::MalformedResponse(format!(
                "Empty response from deployment {}",
                self.deployment.id
            ))
        })
    }
}

#[async_trait]
impl ChatModel for GatewayChat {
    fn model_name(&self) -> &str {
        &self.deployment.model_name
    }

    fn deployment_id(&self) -> &str {
        &self.deployment.id
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn params(&self) -> &GenerationParams {
        &self.params
    }

    fn direct_access(&self) -> Option<DirectAccess> {
        self.expose_transport.then(|| DirectAccess {
            transport: self.transport.clone(),
            deployment_url: self.deployment.deployment_url.clone(),
            api_version: self
                .provider
                .uses_api_version()
                .then(|| self.api_version.clone()),
        })
    }

    fn serialization_cache(&self) -> &SerializationCache {
        &self.serialized
    }

    #[instrument(
        skip(self, messages),
        fields(deployment = %self.deployment.id, count = messages.len())
    )]
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        let template = self.request_template()?;
        let body = self.build_body(template, messages)?;
        let url = self.url();

        debug!("Invoking {} via {}", self.deployment.model_name, self.provider);
        let response = self.transport.post_json(&url, &self.query(), &body).await?;
        self.parse_response(response)
    }
}
