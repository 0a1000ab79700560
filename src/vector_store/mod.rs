//! Vector store abstraction.
//!
//! Indexes live in memory for the length of a session.

mod memory;

pub use memory::MemoryVectorStore;

use crate::chunking::ContentChunk;
use crate::error::Result;
use crate::transcript::format_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A transcript chunk stored with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID.
    pub id: Uuid,
    /// Video ID this document belongs to.
    pub video_id: String,
    pub video_title: String,
    /// Text content of this chunk.
    pub content: String,
    /// Start time in the video (seconds).
    pub start_seconds: f64,
    /// End time in the video (seconds).
    pub end_seconds: f64,
    /// Embedding vector.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Order of this chunk in the video.
    pub chunk_order: usize,
    /// When this document was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    /// Create a document from a chunk and its embedding.
    pub fn from_chunk(
        video_id: &str,
        video_title: &str,
        chunk: &ContentChunk,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            video_id: video_id.to_string(),
            video_title: video_title.to_string(),
            content: chunk.content.clone(),
            start_seconds: chunk.start_seconds,
            end_seconds: chunk.end_seconds,
            embedding,
            chunk_order: chunk.order,
            indexed_at: Utc::now(),
        }
    }

    /// Format timestamp for display.
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.start_seconds)
    }
}

/// A search result with score.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Bulk upsert documents.
    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize>;

    /// Search for similar documents.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, f32::MIN).await
    }

    /// Search with a minimum similarity threshold.
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Get all documents for a video, in chunk order.
    async fn get_by_video_id(&self, video_id: &str) -> Result<Vec<Document>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> ContentChunk {
        ContentChunk {
            content: content.to_string(),
            start_offset: 0,
            start_seconds: 125.0,
            end_seconds: 130.0,
            order: 0,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &[1.0, 0.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 0.001);
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_document_from_chunk() {
        let doc = Document::from_chunk("v", "Video", &chunk("abcdef"), vec![0.5]);
        assert_eq!(doc.format_timestamp(), "02:05");
        assert_eq!(doc.end_seconds, 130.0);
        assert_eq!(doc.embedding, vec![0.5]);
    }
}
