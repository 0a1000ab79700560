//! Time-based splitting.

use super::{Chunker, ContentChunk};
use crate::error::Result;
use crate::transcript::Transcript;
use async_trait::async_trait;

/// Splits transcripts into fixed-duration windows.
pub struct TemporalSplitter {
    target_seconds: f64,
}

impl TemporalSplitter {
    pub fn new(target_seconds: u32) -> Self {
        Self {
            target_seconds: target_seconds.max(1) as f64,
        }
    }
}

impl Default for TemporalSplitter {
    fn default() -> Self {
        Self::new(180)
    }
}

#[async_trait]
impl Chunker for TemporalSplitter {
    async fn chunk(&self, transcript: &Transcript) -> Result<Vec<ContentChunk>> {
        let mut chunks = Vec::new();
        if transcript.segments.is_empty() {
            return Ok(chunks);
        }

        let offsets = transcript.segment_offsets();
        let total_duration = transcript.duration_seconds;
        let mut chunk_start = 0.0;

        while chunk_start < total_duration {
            let chunk_end = (chunk_start + self.target_seconds).min(total_duration);

            // Segments overlapping the window
            let in_window: Vec<usize> = transcript
                .segments
                .iter()
                .enumerate()
                .filter(|(_, seg)| seg.start_seconds < chunk_end && seg.end_seconds > chunk_start)
                .map(|(i, _)| i)
                .collect();

            let content = in_window
                .iter()
                .map(|&i| transcript.segments[i].text.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            if let (Some(&first), false) = (in_window.first(), content.trim().is_empty()) {
                chunks.push(ContentChunk {
                    content: content.trim().to_string(),
                    start_offset: offsets[first],
                    start_seconds: chunk_start,
                    end_seconds: chunk_end,
                    order: chunks.len(),
                });
            }

            chunk_start = chunk_end;
        }

        Ok(chunks)
    }
}
