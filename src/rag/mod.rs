//! Question answering over video transcripts.
//!
//! A [`VideoIndex`] holds one video's embedded transcript chunks for the
//! length of a session. [`VideoAssistant`] builds indexes from URLs and
//! answers questions against them with the `video_qa` prompt.

mod assistant;
mod index;

pub use assistant::{VideoAnswer, VideoAssistant};
pub use index::VideoIndex;

use crate::transcript::watch_url;
use crate::vector_store::SearchResult;
use serde::Serialize;

/// A retrieved chunk with display metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ContextChunk {
    pub video_id: String,
    pub video_title: String,
    /// Formatted timestamp (e.g., "02:34").
    pub timestamp: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// Text content.
    pub content: String,
    /// Similarity score.
    pub score: f32,
    /// Watch URL starting at this chunk.
    pub url: String,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        let url = watch_url(&result.document.video_id, result.document.start_seconds);
        Self {
            timestamp: result.document.format_timestamp(),
            video_id: result.document.video_id,
            video_title: result.document.video_title,
            start_seconds: result.document.start_seconds,
            content: result.document.content,
            score: result.score,
            url,
        }
    }
}
