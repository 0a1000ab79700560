//! Fakes shared by unit tests.

use crate::embedding::Embedder;
use crate::error::{ChainlabError, Result};
use crate::gateway::Transport;
use crate::llm::{
    ChatMessage, ChatModel, DirectAccess, GenerationParams, Provider, SerializationCache,
};
use crate::transcript::{Transcript, TranscriptLoader};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A request seen by [`RecordingTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Value,
}

/// Transport that replays queued responses and records every request.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<Result<Value>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingTransport {
    pub fn replying(response: Result<Value>) -> Self {
        Self::with_responses(vec![response])
    }

    pub fn with_responses(responses: Vec<Result<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_json(&self, url: &str, query: &[(&str, &str)], body: &Value) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.clone(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChainlabError::Gateway("no response queued".to_string())))
    }
}

/// Chat model that replays scripted answers.
pub struct ScriptedModel {
    provider: Provider,
    params: GenerationParams,
    responses: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
    direct: Option<Arc<RecordingTransport>>,
    fail_when_cached: bool,
    cache: SerializationCache,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            provider: Provider::OpenAi,
            params: GenerationParams::default(),
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            direct: None,
            fail_when_cached: false,
            cache: SerializationCache::default(),
        }
    }

    /// Model answering every call with the given texts in order.
    pub fn answering(answers: &[&str]) -> Self {
        Self::new(answers.iter().map(|a| Ok(a.to_string())).collect())
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    /// Expose a raw transport through `direct_access`.
    pub fn with_direct(mut self, transport: Arc<RecordingTransport>) -> Self {
        self.direct = Some(transport);
        self
    }

    /// Fail `invoke` whenever the serialization cache is already filled.
    pub fn failing_when_cached(mut self) -> Self {
        self.fail_when_cached = true;
        self
    }

    /// Messages of every `invoke` call.
    pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
        self.prompts.lock().unwrap().clone()
    }

    /// User content of every `invoke` call, joined per call.
    pub fn prompt_texts(&self) -> Vec<String> {
        self.prompts()
            .iter()
            .map(|m| {
                m.iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    fn deployment_id(&self) -> &str {
        "d-scripted"
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn params(&self) -> &GenerationParams {
        &self.params
    }

    fn direct_access(&self) -> Option<DirectAccess> {
        self.direct.as_ref().map(|t| DirectAccess {
            transport: t.clone(),
            deployment_url: "https://gw/v2/inference/deployments/d-scripted".to_string(),
            api_version: self
                .provider
                .uses_api_version()
                .then(|| "2024-02-01".to_string()),
        })
    }

    fn serialization_cache(&self) -> &SerializationCache {
        &self.cache
    }

    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
        if self.fail_when_cached && self.cache.snapshot().is_some() {
            return Err(ChainlabError::Gateway(
                "circular reference in cached request".to_string(),
            ));
        }
        self.cache.get_or_insert_with(|| json!({ "model": "scripted" }));
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChainlabError::Gateway("no answer scripted".to_string())))
    }
}

/// Deterministic bag-of-words embedder.
pub struct HashEmbedder {
    dims: usize,
    calls: AtomicUsize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self {
            dims: 64,
            calls: AtomicUsize::new(0),
        }
    }
}

impl HashEmbedder {
    /// Number of embed/embed_batch calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x100000001b3)
                });
            v[(hash % self.dims as u64) as usize] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dims)
    }
}

/// Loader returning a fixed transcript.
pub struct StaticLoader {
    transcript: Transcript,
    loads: AtomicUsize,
}

impl StaticLoader {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptLoader for StaticLoader {
    async fn load(&self, _url: &str) -> Result<Transcript> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.transcript.clone())
    }
}
