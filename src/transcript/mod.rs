//! Video transcripts and the loaders that fetch them.

mod youtube;

pub use youtube::{extract_video_id, parse_json3, select_track, CaptionTrack, YoutubeLoader};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Something that can turn a video URL into a transcript.
#[async_trait]
pub trait TranscriptLoader: Send + Sync {
    /// Load the transcript of a video.
    ///
    /// A video without captions yields an empty transcript, not an error.
    async fn load(&self, url: &str) -> Result<Transcript>;
}

/// A complete transcript with segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Video ID this transcript belongs to.
    pub video_id: String,
    /// Video title, if known.
    pub title: String,
    /// Caption language the transcript was taken from.
    pub language: Option<String>,
    /// Individual transcript segments with timestamps.
    pub segments: Vec<TranscriptSegment>,
    /// Full transcript text (segments joined by a single space).
    pub full_text: String,
    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl Transcript {
    /// Create a new transcript from segments.
    pub fn new(video_id: String, title: String, segments: Vec<TranscriptSegment>) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let duration_seconds = segments.last().map(|s| s.end_seconds).unwrap_or(0.0);

        Self {
            video_id,
            title,
            language: None,
            segments,
            full_text,
            duration_seconds,
        }
    }

    /// Transcript of a video without captions.
    pub fn empty(video_id: String, title: String) -> Self {
        Self::new(video_id, title, Vec::new())
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.full_text.trim().is_empty()
    }

    /// Character offset of each segment within `full_text`.
    pub fn segment_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.segments.len());
        let mut offset = 0;
        for segment in &self.segments {
            offsets.push(offset);
            offset += segment.text.chars().count() + 1;
        }
        offsets
    }

    /// Segment containing a character offset of `full_text`.
    ///
    /// Offsets past the end resolve to the last segment.
    pub fn segment_at(&self, char_offset: usize) -> Option<&TranscriptSegment> {
        let offsets = self.segment_offsets();
        let index = offsets.partition_point(|&o| o <= char_offset).saturating_sub(1);
        self.segments.get(index)
    }

    /// Start time of the segment containing a character offset.
    pub fn seconds_at(&self, char_offset: usize) -> f64 {
        self.segment_at(char_offset)
            .map(|s| s.start_seconds)
            .unwrap_or(0.0)
    }
}

/// A single caption line with timestamp information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start_seconds: f64, end_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: text.into(),
        }
    }
}

/// Watch URL starting at a given second.
pub fn watch_url(video_id: &str, seconds: f64) -> String {
    format!("https://youtube.com/watch?v={}&t={}s", video_id, seconds as u32)
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
