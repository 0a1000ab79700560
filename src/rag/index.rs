//! Per-video vector index.

use super::ContextChunk;
use crate::chunking::ContentChunk;
use crate::embedding::Embedder;
use crate::error::{ChainlabError, Result};
use crate::transcript::Transcript;
use crate::vector_store::{Document, MemoryVectorStore, VectorStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Embedded chunks of a single video, held in memory.
pub struct VideoIndex {
    video_id: String,
    title: String,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunk_count: usize,
    min_score: f32,
}

impl std::fmt::Debug for VideoIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoIndex")
            .field("video_id", &self.video_id)
            .field("title", &self.title)
            .field("chunk_count", &self.chunk_count)
            .finish()
    }
}

impl VideoIndex {
    /// Embed `chunks` and index them.
    ///
    /// Fails with [`ChainlabError::EmptyTranscript`] before any embedding
    /// call when the transcript or the chunk list is empty.
    #[instrument(skip_all, fields(video_id = %transcript.video_id, chunks = chunks.len()))]
    pub async fn build(
        transcript: &Transcript,
        chunks: &[ContentChunk],
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        if transcript.is_empty() || chunks.is_empty() {
            return Err(ChainlabError::EmptyTranscript(transcript.video_id.clone()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(ChainlabError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let documents: Vec<Document> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                Document::from_chunk(&transcript.video_id, &transcript.title, chunk, embedding)
            })
            .collect();

        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let chunk_count = store.upsert_batch(&documents).await?;
        info!("Indexed {} chunks for {}", chunk_count, transcript.video_id);

        Ok(Self {
            video_id: transcript.video_id.clone(),
            title: transcript.title.clone(),
            store,
            embedder,
            chunk_count,
            min_score: f32::MIN,
        })
    }

    /// Drop results scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// The `k` chunks most similar to `query`, best first.
    #[instrument(skip(self, query), fields(video_id = %self.video_id))]
    pub async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ContextChunk>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = self
            .store
            .search_with_threshold(&query_embedding, k, self.min_score)
            .await?;
        debug!("Found {} matching chunks", results.len());
        Ok(results.into_iter().map(ContextChunk::from).collect())
    }

    /// Indexed chunks in transcript order.
    pub async fn documents(&self) -> Result<Vec<Document>> {
        self.store.get_by_video_id(&self.video_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::RecursiveCharacterSplitter;
    use crate::test_support::HashEmbedder;
    use crate::transcript::TranscriptSegment;

    fn transcript() -> Transcript {
        Transcript::new(
            "dQw4w9WgXcQ".to_string(),
            "Space Talk".to_string(),
            vec![
                TranscriptSegment::new(0.0, 10.0, "A supernova is the explosion of a star."),
                TranscriptSegment::new(10.0, 20.0, "Black holes bend light around them."),
                TranscriptSegment::new(20.0, 30.0, "Pulsars spin very fast and emit beams."),
            ],
        )
    }

    fn chunks(transcript: &Transcript) -> Vec<ContentChunk> {
        RecursiveCharacterSplitter::new(40, 0)
            .unwrap()
            .split_transcript(transcript)
    }

    #[tokio::test]
    async fn test_build_and_search() {
        let transcript = transcript();
        let embedder = Arc::new(HashEmbedder::default());
        let index = VideoIndex::build(&transcript, &chunks(&transcript), embedder)
            .await
            .unwrap();

        assert_eq!(index.chunk_count(), 3);
        assert_eq!(index.documents().await.unwrap()[0].chunk_order, 0);

        let results = index.similarity_search("Pulsars spin fast", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].content.starts_with("Pulsars"));
        assert_eq!(results[0].url, "https://youtube.com/watch?v=dQw4w9WgXcQ&t=20s");
        assert_eq!(results[0].video_title, "Space Talk");
    }

    #[tokio::test]
    async fn test_empty_transcript_fails_before_embedding() {
        let embedder = Arc::new(HashEmbedder::default());
        let empty = Transcript::empty("abc".to_string(), "t".to_string());

        let err = VideoIndex::build(&empty, &[], embedder.clone()).await.unwrap_err();
        assert!(matches!(err, ChainlabError::EmptyTranscript(id) if id == "abc"));

        let err = VideoIndex::build(&transcript(), &[], embedder.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ChainlabError::EmptyTranscript(_)));
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_min_score_filters() {
        let transcript = transcript();
        let index = VideoIndex::build(
            &transcript,
            &chunks(&transcript),
            Arc::new(HashEmbedder::default()),
        )
        .await
        .unwrap()
        .with_min_score(1.01);

        assert!(index.similarity_search("supernova", 4).await.unwrap().is_empty());
    }
}
