//! In-memory vector store implementation.

use super::{cosine_similarity, Document, SearchResult, VectorStore};
use crate::error::{ChainlabError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    documents: RwLock<HashMap<Uuid, Document>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, Document>>> {
        self.documents
            .read()
            .map_err(|_| ChainlabError::VectorStore("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, Document>>> {
        self.documents
            .write()
            .map_err(|_| ChainlabError::VectorStore("lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_batch(&self, docs: &[Document]) -> Result<usize> {
        let mut store = self.write()?;
        for doc in docs {
            store.insert(doc.id, doc.clone());
        }
        Ok(docs.len())
    }

    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let docs = self.read()?;

        let mut results: Vec<SearchResult> = docs
            .values()
            .map(|doc| SearchResult {
                score: cosine_similarity(query_embedding, &doc.embedding),
                document: doc.clone(),
            })
            .filter(|r| r.score >= min_score)
            .collect();

        // Ties keep transcript order
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.document.chunk_order.cmp(&b.document.chunk_order))
        });
        results.truncate(limit);

        Ok(results)
    }

    async fn get_by_video_id(&self, video_id: &str) -> Result<Vec<Document>> {
        let docs = self.read()?;
        let mut result: Vec<Document> = docs
            .values()
            .filter(|d| d.video_id == video_id)
            .cloned()
            .collect();
        result.sort_by_key(|d| d.chunk_order);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ContentChunk;

    fn doc(video_id: &str, content: &str, order: usize, embedding: Vec<f32>) -> Document {
        let chunk = ContentChunk {
            content: content.to_string(),
            start_offset: 0,
            start_seconds: order as f64 * 30.0,
            end_seconds: (order + 1) as f64 * 30.0,
            order,
        };
        Document::from_chunk(video_id, "Test Video", &chunk, embedding)
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(&[
                doc("video1", "Hello world", 0, vec![1.0, 0.0, 0.0]),
                doc("video1", "Goodbye world", 1, vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.content, "Hello world");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_threshold_limit_and_ties() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(&[
                doc("v", "c", 2, vec![1.0, 0.0]),
                doc("v", "a", 0, vec![1.0, 0.0]),
                doc("v", "b", 1, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 2).await.unwrap();
        let contents: Vec<&str> = results.iter().map(|r| r.document.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "c"]);

        let above = store.search_with_threshold(&[0.0, 1.0], 10, 0.5).await.unwrap();
        assert_eq!(above.len(), 1);
    }

    #[tokio::test]
    async fn test_get_by_video_id_in_chunk_order() {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(&[
                doc("v1", "second", 1, vec![1.0]),
                doc("v1", "first", 0, vec![1.0]),
                doc("v2", "other", 0, vec![1.0]),
            ])
            .await
            .unwrap();

        let docs = store.get_by_video_id("v1").await.unwrap();
        let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert!(store.get_by_video_id("v3").await.unwrap().is_empty());
    }
}
