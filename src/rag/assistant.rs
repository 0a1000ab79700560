//! Video question answering.

use super::{ContextChunk, VideoIndex};
use crate::chain::{variables, LlmChain, OutputParser, PromptTemplate};
use crate::chunking::{create_chunker, Chunker};
use crate::config::{Prompts, Settings};
use crate::embedding::Embedder;
use crate::error::{ChainlabError, Result};
use crate::fallback::InvocationPath;
use crate::gateway::Gateway;
use crate::llm::{init_embedding_model, init_llm, ChatModel, InitOptions};
use crate::transcript::{TranscriptLoader, YoutubeLoader};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Answer to a question about a video.
#[derive(Debug, Clone, Serialize)]
pub struct VideoAnswer {
    /// Answer text on a single line.
    pub answer: String,
    /// Chunks the answer was generated from, best first.
    pub sources: Vec<ContextChunk>,
    /// Set when the answer went through the fallback sequence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<InvocationPath>,
}

/// Loads, indexes and answers questions about videos.
pub struct VideoAssistant {
    loader: Arc<dyn TranscriptLoader>,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    chain: LlmChain,
    use_fallback: bool,
    min_score: f32,
}

impl VideoAssistant {
    pub fn new(
        loader: Arc<dyn TranscriptLoader>,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
        prompts: &Prompts,
    ) -> Self {
        let prompt =
            PromptTemplate::new(prompts.video.qa.clone()).with_partials(&prompts.variables);
        Self {
            loader,
            chunker,
            embedder,
            chain: LlmChain::new(prompt, model).with_parser(OutputParser::SingleLine),
            use_fallback: false,
            min_score: f32::MIN,
        }
    }

    /// Assistant wired to the gateway models and YouTube loader from settings.
    pub async fn from_settings(settings: &Settings, gateway: Arc<Gateway>) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let chunker: Arc<dyn Chunker> = Arc::from(create_chunker(&settings.splitter)?);
        let embedder = init_embedding_model(gateway.clone(), settings).await?;
        let model = init_llm(
            gateway,
            &settings.llm.model,
            InitOptions::from_settings(settings)?,
        )
        .await?;

        Ok(Self::new(
            Arc::new(YoutubeLoader::new(&settings.youtube)),
            chunker,
            Arc::new(embedder),
            Arc::new(model),
            &prompts,
        )
        .with_fallback(settings.llm.fallback)
        .with_min_score(settings.retrieval.min_score))
    }

    /// Route answers through the fallback sequence.
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.use_fallback = enabled;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Load a video's transcript, split it and index the chunks.
    #[instrument(skip(self))]
    pub async fn create_index(&self, url: &str) -> Result<VideoIndex> {
        let transcript = self.loader.load(url).await?;
        if transcript.is_empty() {
            return Err(ChainlabError::EmptyTranscript(transcript.video_id));
        }

        let chunks = self.chunker.chunk(&transcript).await?;
        info!("Split transcript into {} chunks", chunks.len());

        Ok(VideoIndex::build(&transcript, &chunks, self.embedder.clone())
            .await?
            .with_min_score(self.min_score))
    }

    /// Answer a question from the `k` most relevant chunks of an index.
    #[instrument(skip(self, index), fields(video_id = %index.video_id()))]
    pub async fn answer(
        &self,
        index: &VideoIndex,
        question: &str,
        k: usize,
    ) -> Result<VideoAnswer> {
        let sources = index.similarity_search(question, k).await?;
        let docs = sources
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let vars = variables([("question", question), ("docs", docs.as_str())]);

        if self.use_fallback {
            let response = self.chain.invoke_or_degrade(&vars).await;
            return Ok(VideoAnswer {
                answer: response.text,
                sources,
                path: Some(response.path),
            });
        }

        Ok(VideoAnswer {
            answer: self.chain.invoke(&vars).await?,
            sources,
            path: None,
        })
    }

    /// Index a video and answer one question about it.
    pub async fn ask(&self, url: &str, question: &str, k: usize) -> Result<VideoAnswer> {
        let index = self.create_index(url).await?;
        self.answer(&index, question, k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::RecursiveCharacterSplitter;
    use crate::test_support::{HashEmbedder, ScriptedModel, StaticLoader};
    use crate::transcript::{Transcript, TranscriptSegment};

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

    fn assistant(
        transcript: Transcript,
        model: Arc<ScriptedModel>,
        embedder: Arc<HashEmbedder>,
    ) -> (VideoAssistant, Arc<StaticLoader>) {
        let loader = Arc::new(StaticLoader::new(transcript));
        let assistant = VideoAssistant::new(
            loader.clone(),
            Arc::new(RecursiveCharacterSplitter::new(40, 0).unwrap()),
            embedder,
            model,
            &Prompts::default(),
        );
        (assistant, loader)
    }

    #[tokio::test]
    async fn test_answer_uses_top_chunks() {
        let model = Arc::new(ScriptedModel::answering(&["Pulsars\nspin fast."]));
        let (assistant, _) =
            assistant(transcript(), model.clone(), Arc::new(HashEmbedder::default()));

        let index = assistant.create_index("https://youtu.be/dQw4w9WgXcQ").await.unwrap();
        assert_eq!(index.chunk_count(), 3);

        let answer = assistant.answer(&index, "How fast do pulsars spin?", 1).await.unwrap();
        assert_eq!(answer.answer, "Pulsarsspin fast.");
        assert_eq!(answer.sources.len(), 1);
        assert!(answer.path.is_none());

        let prompt = &model.prompt_texts()[0];
        assert!(prompt.contains("Answer the following question: How fast do pulsars spin?"));
        assert!(prompt.contains("Pulsars spin very fast and emit beams."));
        assert!(!prompt.contains("Black holes"));
    }

    #[tokio::test]
    async fn test_empty_transcript_is_reported() {
        let embedder = Arc::new(HashEmbedder::default());
        let (assistant, loader) = assistant(
            Transcript::empty("dQw4w9WgXcQ".to_string(), "Silent".to_string()),
            Arc::new(ScriptedModel::answering(&[])),
            embedder.clone(),
        );

        let err = assistant.create_index("dQw4w9WgXcQ").await.unwrap_err();
        assert_eq!(err.to_string(), "No transcript found for the video: dQw4w9WgXcQ");
        assert_eq!(loader.loads(), 1);
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_answers_never_fail() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let (assistant, _) = assistant(transcript(), model, Arc::new(HashEmbedder::default()));
        let assistant = assistant.with_fallback(true);

        let answer = assistant.ask("dQw4w9WgXcQ", "What is a supernova?", 4).await.unwrap();
        assert_eq!(answer.path, Some(InvocationPath::Degraded));
        assert!(answer.answer.starts_with("ERROR:"));
        assert_eq!(answer.sources.len(), 3);
    }
}
