//! Recursive character text splitter.
//!
//! Splits on the coarsest separator present in the text, recursing with finer
//! separators into pieces that are still too long, then greedily merges
//! adjacent pieces into chunks of at most `chunk_size` characters that share
//! up to `chunk_overlap` characters with their predecessor. Lengths are
//! counted in `char`s.

use std::collections::VecDeque;

use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ChunkingConfig;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Greedy recursive splitter.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Default for TextSplitter {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: config.separators,
        }
    }
}

impl TextSplitter {
    pub fn new(config: &ChunkingConfig) -> DomainResult<Self> {
        config.validate().map_err(DomainError::ValidationFailed)?;
        Ok(Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: config.separators.clone(),
        })
    }

    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub const fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks in document order.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().cloned().unwrap_or_default();
        let mut finer: &[String] = &[];

        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = String::new();
                break;
            }
            if text.contains(candidate.as_str()) {
                separator.clone_from(candidate);
                finer = &separators[i + 1..];
                break;
            }
        }

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator.as_str()).filter(|s| !s.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut short: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge_pieces(&short, &separator));
                short.clear();
            }
            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !short.is_empty() {
            chunks.extend(self.merge_pieces(&short, &separator));
        }
        chunks
    }

    fn merge_pieces(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0_usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { separator_len };

            if total + len + joiner > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        size = total,
                        chunk_size = self.chunk_size,
                        "Created a chunk longer than the configured size"
                    );
                }
                if !window.is_empty() {
                    if let Some(chunk) = join_window(&window, separator) {
                        chunks.push(chunk);
                    }
                    // Shrink the window to the overlap, and further until the
                    // next piece fits.
                    while total > self.chunk_overlap
                        || (total > 0
                            && total + len + if window.is_empty() { 0 } else { separator_len }
                                > self.chunk_size)
                    {
                        let popped_joiner = if window.len() > 1 { separator_len } else { 0 };
                        let Some(first) = window.pop_front() else {
                            break;
                        };
                        total = total.saturating_sub(char_len(first) + popped_joiner);
                    }
                }
            }

            window.push_back(piece);
            total += len + if window.len() > 1 { separator_len } else { 0 };
        }

        if let Some(chunk) = join_window(&window, separator) {
            chunks.push(chunk);
        }
        chunks
    }
}

fn join_window(window: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
