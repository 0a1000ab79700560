//! Chat models hosted behind the gateway.
//!
//! A [`ChatModel`] is bound to one deployment. It offers a typed invocation
//! path and, optionally, direct access to its raw transport for callers that
//! want to build provider payloads themselves (see [`crate::fallback`]).

mod bedrock;
mod chat;
mod init;
mod provider;

pub use chat::GatewayChat;
pub use init::{init_embedding_model, init_llm, InitOptions};
pub use provider::{Provider, ANTHROPIC_VERSION, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

use crate::error::Result;
use crate::gateway::Transport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generation parameters. Unset fields use provider defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub stop: Option<Vec<String>>,
}

impl GenerationParams {
    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }
}

/// Raw transport handle exposed by a model.
#[derive(Clone)]
pub struct DirectAccess {
    pub transport: Arc<dyn Transport>,
    pub deployment_url: String,
    /// `api-version` query value for OpenAI-family endpoints.
    pub api_version: Option<String>,
}

/// Cached serialized request template of a model.
///
/// Models fill the slot lazily on first use. [`SerializationCache::bypass`]
/// clears it for the lifetime of the returned guard. Guards may overlap;
/// the value held before the first one is restored when the last one drops,
/// whatever happened in between.
#[derive(Debug, Default)]
pub struct SerializationCache {
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    slot: Option<Value>,
    saved: Option<Value>,
    bypasses: usize,
}

impl SerializationCache {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached template, building it on first use.
    pub fn get_or_insert_with<F>(&self, build: F) -> Value
    where
        F: FnOnce() -> Value,
    {
        self.lock().slot.get_or_insert_with(build).clone()
    }

    /// Current cached value.
    pub fn snapshot(&self) -> Option<Value> {
        self.lock().slot.clone()
    }

    /// Clear the cache until the returned guard is dropped.
    pub fn bypass(&self) -> CacheBypass<'_> {
        let mut state = self.lock();
        if state.bypasses == 0 {
            state.saved = state.slot.take();
        } else {
            state.slot = None;
        }
        state.bypasses += 1;
        CacheBypass { cache: self }
    }
}

/// Restores a [`SerializationCache`] when the last overlapping guard drops.
pub struct CacheBypass<'a> {
    cache: &'a SerializationCache,
}

impl Drop for CacheBypass<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        state.bypasses -= 1;
        if state.bypasses == 0 {
            state.slot = state.saved.take();
        }
    }
}

/// A chat-capable model bound to a deployment.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model name as registered with the gateway.
    fn model_name(&self) -> &str;

    /// Deployment this model is bound to.
    fn deployment_id(&self) -> &str;

    fn provider(&self) -> Provider;

    fn params(&self) -> &GenerationParams;

    /// Direct transport access, if the model exposes it.
    fn direct_access(&self) -> Option<DirectAccess>;

    fn serialization_cache(&self) -> &SerializationCache;

    /// Invoke with a structured message list.
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Invoke with a plain text prompt.
    async fn invoke_text(&self, prompt: &str) -> Result<String> {
        self.invoke(&[ChatMessage::user(prompt)]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_fills_once() {
        let cache = SerializationCache::default();
        assert!(cache.snapshot().is_none());

        let first = cache.get_or_insert_with(|| json!({"model": "gpt-4o"}));
        let second = cache.get_or_insert_with(|| json!({"model": "other"}));
        assert_eq!(first, second);
    }

    #[test]
    fn test_bypass_restores_previous_value() {
        let cache = SerializationCache::default();
        cache.get_or_insert_with(|| json!({"model": "gpt-4o"}));

        {
            let _guard = cache.bypass();
            assert!(cache.snapshot().is_none());
            // Rebuilt while bypassed; discarded on restore
            cache.get_or_insert_with(|| json!({"model": "fresh"}));
        }

        assert_eq!(cache.snapshot(), Some(json!({"model": "gpt-4o"})));
    }

    #[test]
    fn test_bypass_restores_on_panic() {
        let cache = SerializationCache::default();
        cache.get_or_insert_with(|| json!(1));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = cache.bypass();
            panic!("boom");
        }));

        assert!(result.is_err());
        assert_eq!(cache.snapshot(), Some(json!(1)));
    }

    #[test]
    fn test_overlapping_bypasses_restore_original() {
        let cache = SerializationCache::default();
        cache.get_or_insert_with(|| json!({"model": "original"}));

        let first = cache.bypass();
        let second = cache.bypass();
        drop(first);
        assert!(cache.snapshot().is_none());
        drop(second);

        assert_eq!(cache.snapshot(), Some(json!({"model": "original"})));
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::user("hi").role, Role::User);
        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::assistant("a").content, "a");
    }
}
