//! Model initialization helpers.

use super::{GatewayChat, GenerationParams, Provider};
use crate::config::Settings;
use crate::embedding::GatewayEmbedder;
use crate::error::{ChainlabError, Result};
use crate::gateway::{DeploymentRegistry, Gateway};
use std::sync::Arc;
use tracing::info;

/// Options for [`init_llm`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Explicit deployment ID; skips registry resolution.
    pub deployment_id: Option<String>,
    /// Provider override; detected from the model name otherwise.
    pub provider: Option<Provider>,
    pub params: GenerationParams,
}

impl InitOptions {
    /// Options for the chat model configured in `[llm]`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let provider = settings
            .llm
            .provider
            .as_deref()
            .map(|p| p.parse::<Provider>())
            .transpose()
            .map_err(ChainlabError::Config)?;

        Ok(Self {
            deployment_id: settings.llm.deployment_id.clone(),
            provider,
            params: GenerationParams {
                max_tokens: settings.llm.max_tokens,
                temperature: settings.llm.temperature,
                stop: None,
            },
        })
    }
}

/// Initialize a chat model by name.
pub async fn init_llm(
    gateway: Arc<Gateway>,
    model_name: &str,
    options: InitOptions,
) -> Result<GatewayChat> {
    let registry = DeploymentRegistry::new(gateway.clone());
    let deployment = registry
        .resolve(model_name, options.deployment_id.as_deref())
        .await?;
    let provider = options
        .provider
        .unwrap_or_else(|| Provider::detect(model_name));

    info!(
        "Initialized {} ({}) on deployment {}",
        model_name, provider, deployment.id
    );

    let api_version = gateway.api_version().to_string();
    Ok(GatewayChat::new(
        deployment,
        provider,
        options.params,
        gateway,
        &api_version,
    ))
}

/// Initialize the embedding model configured in `[embedding]`.
pub async fn init_embedding_model(
    gateway: Arc<Gateway>,
    settings: &Settings,
) -> Result<GatewayEmbedder> {
    let registry = DeploymentRegistry::new(gateway.clone());
    let deployment = registry
        .resolve(
            &settings.embedding.model,
            settings.embedding.deployment_id.as_deref(),
        )
        .await?;

    info!(
        "Initialized embedding model {} on deployment {}",
        settings.embedding.model, deployment.id
    );

    Ok(GatewayEmbedder::new(
        deployment,
        gateway.clone(),
        gateway.api_version(),
        settings.embedding.dimensions,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_settings() {
        let mut settings = Settings::default();
        settings.llm.provider = Some("bedrock-invoke".to_string());
        settings.llm.deployment_id = Some("d0a6f0c69d44cb5b".to_string());
        settings.llm.temperature = Some(0.7);

        let options = InitOptions::from_settings(&settings).unwrap();
        assert_eq!(options.provider, Some(Provider::BedrockInvoke));
        assert_eq!(options.params.max_tokens, Some(300));
        assert_eq!(options.params.temperature, Some(0.7));
    }

    #[test]
    fn test_bad_provider_is_config_error() {
        let mut settings = Settings::default();
        settings.llm.provider = Some("palm".to_string());
        assert!(matches!(
            InitOptions::from_settings(&settings),
            Err(ChainlabError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_init_with_explicit_deployment() {
        let gateway = Arc::new(Gateway::new(&Settings::default().gateway).unwrap());
        let options = InitOptions {
            deployment_id: Some("abc".to_string()),
            ..Default::default()
        };

        let chat = init_llm(gateway, "anthropic--claude-4-sonnet", options)
            .await
            .unwrap();
        assert_eq!(chat.deployment().id, "abc");
        assert_eq!(
            crate::llm::ChatModel::provider(&chat),
            Provider::BedrockConverse
        );
    }
}
