//! Recursive character splitting.
//!
//! Text is cut on the first separator that occurs in it. Pieces that still
//! exceed the budget are cut again on the next separator. Adjacent small
//! pieces are then merged back up to `chunk_size` characters, and each new
//! chunk starts with up to `chunk_overlap` characters of the previous one.

use super::{Chunker, ContentChunk};
use crate::error::{ChainlabError, Result};
use crate::transcript::Transcript;
use async_trait::async_trait;
use std::collections::VecDeque;

/// Paragraph, line, word, character.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A piece of split text and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    /// Character offset in the source text.
    pub start_offset: usize,
}

/// Byte range into the source text.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

/// Character-budget splitter with overlap.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter; `chunk_overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ChainlabError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ChainlabError::Config(format!(
                "Got a larger chunk overlap ({}) than chunk size ({}), should be smaller.",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Split raw text.
    pub fn split_text(&self, text: &str) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        self.split_span(
            text,
            Span {
                start: 0,
                end: text.len(),
            },
            &self.separators,
            &mut spans,
        );

        spans
            .into_iter()
            .filter_map(|span| trim_span(text, span))
            .map(|span| TextSpan {
                text: text[span.start..span.end].to_string(),
                start_offset: text[..span.start].chars().count(),
            })
            .collect()
    }

    fn split_span(&self, text: &str, span: Span, separators: &[String], out: &mut Vec<Span>) {
        let region = &text[span.start..span.end];

        let Some(index) = separators
            .iter()
            .position(|sep| sep.is_empty() || region.contains(sep.as_str()))
        else {
            out.push(span);
            return;
        };
        let separator = separators[index].as_str();
        let remaining = &separators[index + 1..];

        let mut good: Vec<Span> = Vec::new();
        for piece in pieces(region, span.start, separator) {
            if char_len(text, piece) < self.chunk_size {
                good.push(piece);
                continue;
            }

            if !good.is_empty() {
                self.merge(text, &good, out);
                good.clear();
            }
            if remaining.is_empty() {
                out.push(piece);
            } else {
                self.split_span(text, piece, remaining, out);
            }
        }

        if !good.is_empty() {
            self.merge(text, &good, out);
        }
    }

    fn merge(&self, text: &str, pieces: &[Span], out: &mut Vec<Span>) {
        let mut current: VecDeque<Span> = VecDeque::new();

        for &piece in pieces {
            if let (Some(front), Some(back)) = (current.front().copied(), current.back().copied()) {
                let grown = Span {
                    start: front.start,
                    end: piece.end,
                };
                if char_len(text, grown) > self.chunk_size {
                    out.push(Span {
                        start: front.start,
                        end: back.end,
                    });

                    // Keep a tail of at most chunk_overlap characters
                    while let (Some(front), Some(back)) =
                        (current.front().copied(), current.back().copied())
                    {
                        let kept = char_len(
                            text,
                            Span {
                                start: front.start,
                                end: back.end,
                            },
                        );
                        let with_piece = char_len(
                            text,
                            Span {
                                start: front.start,
                                end: piece.end,
                            },
                        );
                        if kept > self.chunk_overlap || with_piece > self.chunk_size {
                            current.pop_front();
                        } else {
                            break;
                        }
                    }
                }
            }
            current.push_back(piece);
        }

        if let (Some(front), Some(back)) = (current.front(), current.back()) {
            out.push(Span {
                start: front.start,
                end: back.end,
            });
        }
    }

    /// Split a transcript, mapping chunk offsets back to timestamps.
    pub fn split_transcript(&self, transcript: &Transcript) -> Vec<ContentChunk> {
        self.split_text(&transcript.full_text)
            .into_iter()
            .enumerate()
            .map(|(order, span)| {
                let last_char = span.start_offset + span.text.chars().count().saturating_sub(1);
                ContentChunk {
                    start_seconds: transcript.seconds_at(span.start_offset),
                    end_seconds: transcript
                        .segment_at(last_char)
                        .map(|s| s.end_seconds)
                        .unwrap_or(0.0),
                    start_offset: span.start_offset,
                    content: span.text,
                    order,
                }
            })
            .collect()
    }
}

#[async_trait]
impl Chunker for RecursiveCharacterSplitter {
    async fn chunk(&self, transcript: &Transcript) -> Result<Vec<ContentChunk>> {
        Ok(self.split_transcript(transcript))
    }
}

/// Non-empty pieces of `region` between occurrences of `separator`.
fn pieces(region: &str, base: usize, separator: &str) -> Vec<Span> {
    if separator.is_empty() {
        return region
            .char_indices()
            .map(|(i, c)| Span {
                start: base + i,
                end: base + i + c.len_utf8(),
            })
            .collect();
    }

    let mut spans = Vec::new();
    let mut start = 0;
    for (i, _) in region.match_indices(separator) {
        spans.push(Span {
            start: base + start,
            end: base + i,
        });
        start = i + separator.len();
    }
    spans.push(Span {
        start: base + start,
        end: base + region.len(),
    });

    spans.retain(|s| s.end > s.start);
    spans
}

fn char_len(text: &str, span: Span) -> usize {
    text[span.start..span.end].chars().count()
}

fn trim_span(text: &str, span: Span) -> Option<Span> {
    let slice = &text[span.start..span.end];
    let trimmed_start = slice.trim_start();
    let start = span.start + (slice.len() - trimmed_start.len());
    let end = start + trimmed_start.trim_end().len();
    (end > start).then_some(Span { start, end })
}
