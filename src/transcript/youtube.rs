//! YouTube captions via yt-dlp.

use super::{Transcript, TranscriptLoader, TranscriptSegment};
use crate::config::YoutubeSettings;
use crate::error::{ChainlabError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, info, instrument, warn};

// Matches various YouTube URL formats and bare video IDs
static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:
            (?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex")
});

/// Extract the video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = VIDEO_ID.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// A downloadable caption track.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language: String,
    pub url: String,
    /// Auto-generated rather than uploaded by the author.
    pub automatic: bool,
}

/// Pick a json3 caption track from yt-dlp metadata.
///
/// Uploaded subtitles win over automatic captions; within each kind,
/// `languages` is tried in order and `en` also matches `en-US`.
pub fn select_track(metadata: &Value, languages: &[String]) -> Option<CaptionTrack> {
    for (key, automatic) in [("subtitles", false), ("automatic_captions", true)] {
        let Some(tracks) = metadata.get(key).and_then(|v| v.as_object()) else {
            continue;
        };

        for wanted in languages {
            let prefix = format!("{}-", wanted);
            let mut candidates: Vec<&String> = tracks
                .keys()
                .filter(|lang| *lang == wanted || lang.starts_with(&prefix))
                .collect();
            // Exact match first
            candidates.sort_by_key(|lang| (*lang != wanted, lang.len()));

            for lang in candidates {
                let url = tracks[lang.as_str()]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .find(|f| f["ext"].as_str() == Some("json3"))
                    .and_then(|f| f["url"].as_str());

                if let Some(url) = url {
                    return Some(CaptionTrack {
                        language: lang.clone(),
                        url: url.to_string(),
                        automatic,
                    });
                }
            }
        }
    }
    None
}

/// Parse a json3 caption document into segments.
pub fn parse_json3(document: &Value) -> Vec<TranscriptSegment> {
    let Some(events) = document["events"].as_array() else {
        return Vec::new();
    };

    events
        .iter()
        .filter_map(|event| {
            let segs = event["segs"].as_array()?;
            let text: String = segs
                .iter()
                .filter_map(|s| s["utf8"].as_str())
                .collect::<String>()
                .replace('\n', " ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }

            let start = event["tStartMs"].as_f64().unwrap_or(0.0) / 1000.0;
            let duration = event["dDurationMs"].as_f64().unwrap_or(0.0) / 1000.0;
            Some(TranscriptSegment::new(start, start + duration, text))
        })
        .collect()
}

/// Loads YouTube captions through yt-dlp metadata.
pub struct YoutubeLoader {
    ytdlp_path: String,
    languages: Vec<String>,
    http: reqwest::Client,
}

impl YoutubeLoader {
    pub fn new(settings: &YoutubeSettings) -> Self {
        Self {
            ytdlp_path: settings.ytdlp_path.clone(),
            languages: settings.languages.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch video metadata (including caption tracks) using yt-dlp.
    async fn fetch_metadata(&self, video_id: &str) -> Result<Value> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);

        let output = tokio::process::Command::new(&self.ytdlp_path)
            .args(["--dump-json", "--skip-download", "--no-warnings", &url])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ChainlabError::ToolNotFound(self.ytdlp_path.clone())
                } else {
                    ChainlabError::Transcript(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChainlabError::VideoNotFound(format!(
                "Video {} not found or unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            ChainlabError::Transcript(format!("Failed to parse yt-dlp output: {}", e))
        })
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSegment>> {
        let response = self.http.get(&track.url).send().await?;
        if !response.status().is_success() {
            return Err(ChainlabError::Transcript(format!(
                "Caption download failed with status {}",
                response.status()
            )));
        }
        let document: Value = response.json().await?;
        Ok(parse_json3(&document))
    }
}

#[async_trait]
impl TranscriptLoader for YoutubeLoader {
    #[instrument(skip(self))]
    async fn load(&self, url: &str) -> Result<Transcript> {
        let video_id = extract_video_id(url).ok_or_else(|| {
            ChainlabError::InvalidInput(format!("Invalid YouTube video ID or URL: {}", url))
        })?;

        let metadata = self.fetch_metadata(&video_id).await?;
        let title = metadata["title"]
            .as_str()
            .unwrap_or("Unknown Title")
            .to_string();

        let Some(track) = select_track(&metadata, &self.languages) else {
            warn!("No captions available for {}", video_id);
            return Ok(Transcript::empty(video_id, title));
        };

        debug!(
            "Using {} captions ({})",
            track.language,
            if track.automatic { "automatic" } else { "uploaded" }
        );
        let segments = self.fetch_track(&track).await?;
        info!("Loaded {} caption segments for {}", segments.len(), video_id);

        Ok(Transcript::new(video_id, title, segments).with_language(track.language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_video_id() {
        for input in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_video_id(input), Some("dQw4w9WgXcQ".to_string()), "{}", input);
        }

        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id(""), None);
    }

    fn metadata() -> Value {
        json!({
            "title": "Talk",
            "subtitles": {
                "de": [{ "ext": "json3", "url": "https://c/de" }],
                "en-GB": [{ "ext": "vtt", "url": "https://c/en-gb.vtt" }]
            },
            "automatic_captions": {
                "en": [
                    { "ext": "vtt", "url": "https://c/auto-en.vtt" },
                    { "ext": "json3", "url": "https://c/auto-en" }
                ]
            }
        })
    }

    #[test]
    fn test_select_track_prefers_language_order() {
        let track = select_track(&metadata(), &["en".to_string()]).unwrap();
        // en-GB uploaded track has no json3, so the automatic one is used
        assert_eq!(track.url, "https://c/auto-en");
        assert!(track.automatic);

        let track = select_track(&metadata(), &["de".to_string(), "en".to_string()]).unwrap();
        assert_eq!(track.language, "de");
        assert!(!track.automatic);
    }

    #[test]
    fn test_select_track_none() {
        assert!(select_track(&json!({ "title": "x" }), &["en".to_string()]).is_none());
        assert!(select_track(&metadata(), &["fr".to_string()]).is_none());
    }

    #[test]
    fn test_parse_json3() {
        let document = json!({
            "events": [
                { "tStartMs": 0, "dDurationMs": 1500, "segs": [{ "utf8": "hello " }, { "utf8": "world" }] },
                { "tStartMs": 1500, "dDurationMs": 10 },
                { "tStartMs": 1600, "dDurationMs": 400, "segs": [{ "utf8": "\n" }] },
                { "tStartMs": 2000, "dDurationMs": 1000, "segs": [{ "utf8": "again\nand again" }] }
            ]
        });

        let segments = parse_json3(&document);
        assert_eq!(
            segments,
            vec![
                TranscriptSegment::new(0.0, 1.5, "hello world"),
                TranscriptSegment::new(2.0, 3.0, "again and again"),
            ]
        );
        assert!(parse_json3(&json!({})).is_empty());
    }

    fn loader(ytdlp_path: &str) -> YoutubeLoader {
        YoutubeLoader::new(&YoutubeSettings {
            ytdlp_path: ytdlp_path.to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_missing_ytdlp_is_tool_not_found() {
        let err = loader("/nonexistent/yt-dlp").load("dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(
            err,
            ChainlabError::ToolNotFound(path) if path == "/nonexistent/yt-dlp"
        ));
    }

    #[tokio::test]
    async fn test_failing_ytdlp_is_video_not_found() {
        let err = loader("false").load("dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(err, ChainlabError::VideoNotFound(_)));
    }
}
