//! Best-effort invocation that never fails.
//!
//! Three paths are tried in order:
//!
//! 1. **Direct**: when the model exposes its transport, a provider payload is
//!    built by hand and the text is read straight out of the raw response.
//! 2. **High-level**: the model's own `invoke_text`, run with its serialized
//!    request cache cleared. The cache is restored when the call returns.
//! 3. **Degraded**: an `ERROR: ...` string naming the deployment and the last
//!    error.

use crate::error::{ChainlabError, Result};
use crate::llm::ChatModel;
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// Which path produced a [`FallbackResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationPath {
    Direct,
    HighLevel,
    Degraded,
}

impl std::fmt::Display for InvocationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationPath::Direct => write!(f, "direct"),
            InvocationPath::HighLevel => write!(f, "high-level"),
            InvocationPath::Degraded => write!(f, "degraded"),
        }
    }
}

/// Text returned by [`invoke_with_fallback`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackResponse {
    pub text: String,
    pub path: InvocationPath,
}

impl FallbackResponse {
    pub fn is_degraded(&self) -> bool {
        self.path == InvocationPath::Degraded
    }
}

/// Invoke `model` with `prompt`, falling back until something answers.
#[instrument(skip(model, prompt), fields(deployment = %model.deployment_id()))]
pub async fn invoke_with_fallback(model: &dyn ChatModel, prompt: &str) -> FallbackResponse {
    match invoke_direct(model, prompt).await {
        Some(Ok(text)) => {
            return FallbackResponse {
                text: text.trim().to_string(),
                path: InvocationPath::Direct,
            };
        }
        Some(Err(e)) => warn!("Direct invocation failed: {}", e),
        None => debug!("Model exposes no transport; skipping direct invocation"),
    }

    let error = match invoke_bypassing_cache(model, prompt).await {
        Ok(text) => {
            return FallbackResponse {
                text: text.trim().to_string(),
                path: InvocationPath::HighLevel,
            };
        }
        Err(e) => {
            warn!("High-level invocation failed: {}", e);
            e
        }
    };

    FallbackResponse {
        text: format!(
            "ERROR: Could not invoke deployment {}. Last error: {}",
            model.deployment_id(),
            error
        ),
        path: InvocationPath::Degraded,
    }
}

async fn invoke_direct(model: &dyn ChatModel, prompt: &str) -> Option<Result<String>> {
    let access = model.direct_access()?;
    let provider = model.provider();

    let url = format!(
        "{}{}",
        access.deployment_url.trim_end_matches('/'),
        provider.endpoint_path()
    );
    let payload = provider.direct_payload(prompt, model.params());
    let query: Vec<(&str, &str)> = access
        .api_version
        .as_deref()
        .map(|v| vec![("api-version", v)])
        .unwrap_or_default();

    let result = async {
        let response = access.transport.post_json(&url, &query, &payload).await?;
        provider.extract_text(&response)
    }
    .await;
    Some(result)
}

async fn invoke_bypassing_cache(model: &dyn ChatModel, prompt: &str) -> Result<String> {
    let _bypass = model.serialization_cache().bypass();
    let text = model.invoke_text(prompt).await?;
    if text.trim().is_empty() {
        return Err(ChainlabError::MalformedResponse(
            "empty completion".to_string(),
        ));
    }
    Ok(text)
}
