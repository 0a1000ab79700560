//! Model gateway access.
//!
//! The gateway hosts chat and embedding models as deployments. Every request
//! carries a bearer token and the configured resource group.

mod auth;
mod registry;

pub use auth::TokenProvider;
pub use registry::{select_deployment, Deployment, DeploymentRegistry};

use crate::config::GatewaySettings;
use crate::error::{ChainlabError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Header carrying the resource group on every gateway call.
pub const RESOURCE_GROUP_HEADER: &str = "AI-Resource-Group";

/// Raw JSON transport to a deployment.
///
/// This is the handle the fallback sequence uses to talk to a provider
/// without going through a model's typed request path.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON body and return the parsed JSON response.
    async fn post_json(&self, url: &str, query: &[(&str, &str)], body: &Value) -> Result<Value>;
}

/// Create an HTTP client with the configured timeout and resource group header.
pub fn create_http_client(timeout: Duration, resource_group: &str) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    let group = HeaderValue::from_str(resource_group)
        .map_err(|e| ChainlabError::Config(format!("Invalid resource group: {}", e)))?;
    headers.insert(RESOURCE_GROUP_HEADER, group);

    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| ChainlabError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Connection to the model gateway.
pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    auth: TokenProvider,
}

impl Gateway {
    /// Create a gateway connection from settings.
    pub fn new(settings: &GatewaySettings) -> Result<Self> {
        let http = create_http_client(
            Duration::from_secs(settings.timeout_secs),
            &settings.resource_group,
        )?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_version: settings.api_version.clone(),
            auth: TokenProvider::from_settings(settings),
        })
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API version for OpenAI-family inference calls.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Inference URL for a deployment ID.
    pub fn deployment_url(&self, deployment_id: &str) -> String {
        format!("{}/v2/inference/deployments/{}", self.base_url, deployment_id)
    }

    /// Whether any credentials are configured.
    pub fn has_credentials(&self) -> bool {
        !matches!(self.auth, TokenProvider::Anonymous)
    }

    /// GET a JSON document.
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("GET {}", url);
        let mut request = self.http.get(url);
        if let Some(token) = self.auth.bearer(&self.http).await? {
            request = request.bearer_auth(token);
        }
        Self::read_json(url, request.send().await?).await
    }

    async fn read_json(url: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChainlabError::Gateway(format!(
                "{} returned {}: {}",
                url, status, body
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Transport for Gateway {
    async fn post_json(&self, url: &str, query: &[(&str, &str)], body: &Value) -> Result<Value> {
        debug!("POST {}", url);
        let mut request = self.http.post(url).query(query).json(body);
        if let Some(token) = self.auth.bearer(&self.http).await? {
            request = request.bearer_auth(token);
        }
        Self::read_json(url, request.send().await?).await
    }
}
