//! Recursive character splitter.
//!
//! Text is split on the coarsest separator present (`"\n\n"`, then `"\n"`,
//! then `" "`, then between characters). Pieces shorter than the chunk size
//! are merged greedily; longer pieces are split again with the next finer
//! separator. Separators stay attached to the start of the piece that follows
//! them. When a chunk is emitted, pieces are dropped from the front until at
//! most `chunk_overlap` characters remain, and those carry into the next chunk.
//!
//! All lengths are measured in characters, not bytes.

use std::collections::VecDeque;

use crate::config::ChunkingConfig;
use crate::document::PageText;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A bounded-length slice of one page, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the document's chunk sequence.
    pub index: usize,
    /// Page the text came from (0-based).
    pub page: usize,
    pub text: String,
}

/// Splits page text into overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every page, numbering chunks across the whole document.
    pub fn split_pages(&self, pages: &[PageText]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in pages {
            for text in self.split_text(&page.text) {
                chunks.push(Chunk {
                    index: chunks.len(),
                    page: page.page,
                    text,
                });
            }
        }
        chunks
    }

    /// Split one text into trimmed, non-empty chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.split_recursive(text, &DEFAULT_SEPARATORS, &mut out);
        out
    }

    fn split_recursive(&self, text: &str, separators: &[&str], out: &mut Vec<String>) {
        let (separator, finer) =
            match separators.iter().position(|s| s.is_empty() || text.contains(s)) {
                Some(i) if separators[i].is_empty() => ("", &[][..]),
                Some(i) => (separators[i], &separators[i + 1..]),
                None => (separators.last().copied().unwrap_or(""), &[][..]),
            };

        let mut good: Vec<&str> = Vec::new();
        for piece in split_keep_start(text, separator) {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                self.merge(&good, out);
                good.clear();
            }
            if finer.is_empty() {
                out.push(piece.to_string());
            } else {
                self.split_recursive(piece, finer, out);
            }
        }
        if !good.is_empty() {
            self.merge(&good, out);
        }
    }

    fn merge(&self, pieces: &[&str], out: &mut Vec<String>) {
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&window, out);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some((_, front)) = window.pop_front() else {
                        break;
                    };
                    total -= front;
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        push_joined(&window, out);
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Split before every occurrence of `separator`; the empty separator splits
/// between characters. Empty pieces are dropped.
fn split_keep_start<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn push_joined(window: &VecDeque<(&str, usize)>, out: &mut Vec<String>) {
    let joined: String = window.iter().map(|(s, _)| *s).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
