//! Embeddings served by a gateway deployment.

use super::Embedder;
use crate::error::{ChainlabError, Result};
use crate::gateway::{Deployment, Transport};
use async_openai::types::{CreateEmbeddingRequestArgs, CreateEmbeddingResponse, EmbeddingInput};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Texts per embeddings request.
const BATCH_SIZE: usize = 100;

/// Embedding model bound to a gateway deployment.
pub struct GatewayEmbedder {
    deployment: Deployment,
    transport: Arc<dyn Transport>,
    api_version: String,
    dimensions: Option<u32>,
}

impl GatewayEmbedder {
    /// Create an embedder for a deployment.
    pub fn new(
        deployment: Deployment,
        transport: Arc<dyn Transport>,
        api_version: &str,
        dimensions: Option<u32>,
    ) -> Self {
        Self {
            deployment,
            transport,
            api_version: api_version.to_string(),
            dimensions,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/embeddings",
            self.deployment.deployment_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Embedder for GatewayEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ChainlabError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let url = self.url();
        let query = [("api-version", self.api_version.as_str())];
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let mut args = CreateEmbeddingRequestArgs::default();
            args.model(&self.deployment.model_name)
                .input(EmbeddingInput::StringArray(chunk.to_vec()));
            if let Some(dimensions) = self.dimensions {
                args.dimensions(dimensions);
            }
            let request = args
                .build()
                .map_err(|e| ChainlabError::Embedding(format!("Failed to build request: {}", e)))?;

            let body = serde_json::to_value(&request)?;
            let response = self.transport.post_json(&url, &query, &body).await?;
            let response: CreateEmbeddingResponse = serde_json::from_value(response)
                .map_err(|e| ChainlabError::MalformedResponse(format!("embeddings: {}", e)))?;

            if response.data.len() != chunk.len() {
                return Err(ChainlabError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    chunk.len(),
                    response.data.len()
                )));
            }

            // Sort by index to ensure correct order
            let mut embeddings = response.data;
            embeddings.sort_by_key(|e| e.index);
            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimensions.map(|d| d as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingTransport;
    use serde_json::json;

    fn deployment() -> Deployment {
        Deployment {
            id: "e1".to_string(),
            deployment_url: "https://gw/v2/inference/deployments/e1/".to_string(),
            model_name: "text-embedding-ada-002".to_string(),
            model_version: None,
            status: "RUNNING".to_string(),
            scenario_id: None,
            configuration_name: None,
            created_at: None,
        }
    }

    fn response(vectors: &[(u32, Vec<f32>)]) -> serde_json::Value {
        json!({
            "object": "list",
            "model": "text-embedding-ada-002",
            "data": vectors.iter().map(|(i, v)| json!({
                "object": "embedding",
                "index": i,
                "embedding": v,
            })).collect::<Vec<_>>(),
            "usage": { "prompt_tokens": 2, "total_tokens": 2 }
        })
    }

    #[tokio::test]
    async fn test_embed_batch_orders_by_index() {
        let transport = Arc::new(RecordingTransport::replying(Ok(response(&[
            (1, vec![0.0, 1.0]),
            (0, vec![1.0, 0.0]),
        ]))));
        let embedder = GatewayEmbedder::new(deployment(), transport.clone(), "2024-02-01", None);

        let vectors = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

        let calls = transport.calls();
        assert_eq!(calls[0].url, "https://gw/v2/inference/deployments/e1/embeddings");
        assert!(calls[0].body.get("dimensions").is_none());
        assert_eq!(embedder.dimensions(), None);
    }

    #[tokio::test]
    async fn test_empty_input_skips_request() {
        let transport = Arc::new(RecordingTransport::default());
        let embedder = GatewayEmbedder::new(deployment(), transport.clone(), "v", Some(256));
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
        assert!(transport.calls().is_empty());
        assert_eq!(embedder.dimensions(), Some(256));
    }

    #[tokio::test]
    async fn test_count_mismatch_is_error() {
        let transport = Arc::new(RecordingTransport::replying(Ok(response(&[(0, vec![1.0])]))));
        let embedder = GatewayEmbedder::new(deployment(), transport, "v", None);
        let err = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ChainlabError::Embedding(_)));
    }
}
