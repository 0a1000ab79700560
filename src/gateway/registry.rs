//! Deployment registry lookup.

use super::Gateway;
use crate::error::{ChainlabError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A model deployment registered with the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deployment {
    /// Deployment ID.
    pub id: String,
    /// Inference base URL for this deployment.
    pub deployment_url: String,
    /// Model name (e.g. `gpt-4o`, `anthropic--claude-4-sonnet`).
    pub model_name: String,
    pub model_version: Option<String>,
    /// Status reported by the registry (RUNNING, STOPPED, ...).
    pub status: String,
    pub scenario_id: Option<String>,
    pub configuration_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Deployment {
    /// Build a deployment for an explicitly configured ID.
    pub fn from_id(gateway: &Gateway, id: &str, model_name: &str) -> Self {
        Self {
            id: id.to_string(),
            deployment_url: gateway.deployment_url(id),
            model_name: model_name.to_string(),
            model_version: None,
            status: "RUNNING".to_string(),
            scenario_id: None,
            configuration_name: None,
            created_at: None,
        }
    }

    /// Whether the deployment can serve requests.
    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }
}

#[derive(Deserialize)]
struct DeploymentList {
    #[serde(default)]
    resources: Vec<RawDeployment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDeployment {
    id: String,
    #[serde(default)]
    deployment_url: Option<String>,
    #[serde(default)]
    configuration_name: Option<String>,
    #[serde(default)]
    scenario_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    details: Option<Value>,
}

impl RawDeployment {
    fn into_deployment(self, gateway: &Gateway) -> Deployment {
        let model = self
            .details
            .as_ref()
            .and_then(|d| d.pointer("/resources/backend_details/model"));

        let model_name = model
            .and_then(|m| m["name"].as_str())
            .map(|s| s.to_string())
            .or_else(|| self.configuration_name.clone())
            .unwrap_or_default();

        let model_version = model.and_then(|m| m["version"].as_str()).map(|s| s.to_string());

        Deployment {
            deployment_url: self
                .deployment_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| gateway.deployment_url(&self.id)),
            id: self.id,
            model_name,
            model_version,
            status: self.status.unwrap_or_else(|| "UNKNOWN".to_string()),
            scenario_id: self.scenario_id,
            configuration_name: self.configuration_name,
            created_at: self.created_at,
        }
    }
}

/// Pick the first running deployment serving the given model.
pub fn select_deployment<'a>(
    deployments: &'a [Deployment],
    model_name: &str,
) -> Option<&'a Deployment> {
    deployments
        .iter()
        .find(|d| d.is_running() && d.model_name == model_name)
}

/// Client for the gateway's deployment registry.
pub struct DeploymentRegistry {
    gateway: Arc<Gateway>,
}

impl DeploymentRegistry {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// List all deployments visible in the resource group.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Deployment>> {
        let url = format!("{}/v2/lm/deployments", self.gateway.base_url());
        let json = self.gateway.get_json(&url).await?;
        let list: DeploymentList = serde_json::from_value(json)
            .map_err(|e| ChainlabError::MalformedResponse(format!("deployment list: {}", e)))?;

        let deployments: Vec<Deployment> = list
            .resources
            .into_iter()
            .map(|raw| raw.into_deployment(&self.gateway))
            .collect();

        debug!("Registry returned {} deployments", deployments.len());
        Ok(deployments)
    }

    /// Resolve a deployment for a model, or use the explicit ID when given.
    pub async fn resolve(
        &self,
        model_name: &str,
        deployment_id: Option<&str>,
    ) -> Result<Deployment> {
        if let Some(id) = deployment_id {
            return Ok(Deployment::from_id(&self.gateway, id, model_name));
        }

        let deployments = self.list().await?;
        select_deployment(&deployments, model_name)
            .cloned()
            .ok_or_else(|| ChainlabError::DeploymentNotFound(model_name.to_string()))
    }
}
