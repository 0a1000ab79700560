//! chainlab - prompt chains, video question answering and a ReAct agent
//! over models deployed behind an AI Core style gateway.
//!
//! # Overview
//!
//! chainlab allows you to:
//! - Resolve and invoke chat and embedding deployments through the gateway
//! - Run prompt templates through chat models as chains
//! - Index a YouTube video's transcript and answer questions about it
//! - Answer questions with a tool-using agent (Wikipedia, calculator)
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `gateway` - Gateway client, OAuth tokens and the deployment registry
//! - `llm` - Chat models for each provider family
//! - `fallback` - Direct-then-high-level invocation with a degraded result
//! - `chain` - Prompt templates and LLM chains
//! - `transcript` - YouTube transcript loading
//! - `chunking` - Transcript splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - In-memory similarity search
//! - `rag` - Video indexes and question answering
//! - `agent` - ReAct agent and its tools
//! - `web` - HTML pages for the browser form
//!
//! # Example
//!
//! ```rust,no_run
//! use chainlab::config::Settings;
//! use chainlab::gateway::Gateway;
//! use chainlab::rag::VideoAssistant;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let gateway = Arc::new(Gateway::new(&settings.gateway)?);
//!     let assistant = VideoAssistant::from_settings(&settings, gateway).await?;
//!
//!     let answer = assistant
//!         .ask("dQw4w9WgXcQ", "What is the song about?", 4)
//!         .await?;
//!     println!("{}", answer.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chain;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod llm;
pub mod rag;
pub mod transcript;
pub mod vector_store;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ChainlabError, Result};
