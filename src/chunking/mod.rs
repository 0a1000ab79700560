//! Splitting transcripts into indexable chunks.

mod recursive;
mod temporal;

pub use recursive::{RecursiveCharacterSplitter, TextSpan, DEFAULT_SEPARATORS};
pub use temporal::TemporalSplitter;

use crate::config::SplitterSettings;
use crate::error::Result;
use crate::transcript::Transcript;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chunk of content from a video transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentChunk {
    /// Text content of this chunk.
    pub content: String,
    /// Character offset of the chunk within the transcript text.
    pub start_offset: usize,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Order of this chunk in the video.
    pub order: usize,
}

/// Splitting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Character budget with overlap, preferring paragraph, line and word breaks.
    Recursive,
    /// Fixed-duration windows.
    Temporal,
}

impl std::str::FromStr for SplitStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recursive" | "character" => Ok(SplitStrategy::Recursive),
            "temporal" => Ok(SplitStrategy::Temporal),
            _ => Err(format!("Unknown split strategy: {}", s)),
        }
    }
}

/// Trait for transcript splitters.
#[async_trait]
pub trait Chunker: Send + Sync {
    /// Split a transcript into content chunks.
    async fn chunk(&self, transcript: &Transcript) -> Result<Vec<ContentChunk>>;
}

/// Create the splitter configured in `[splitter]`.
pub fn create_chunker(settings: &SplitterSettings) -> Result<Box<dyn Chunker>> {
    let strategy: SplitStrategy = settings
        .strategy
        .parse()
        .map_err(crate::error::ChainlabError::Config)?;

    Ok(match strategy {
        SplitStrategy::Recursive => Box::new(RecursiveCharacterSplitter::new(
            settings.chunk_size,
            settings.chunk_overlap,
        )?),
        SplitStrategy::Temporal => Box::new(TemporalSplitter::new(settings.target_chunk_seconds)),
    })
}
