//! Chunking engine: splits extracted text into bounded, addressable chunks.
//!
//! Three strategies share one post-processing pass (page estimation,
//! minimum-size filtering, renumbering). Offsets are byte offsets into the
//! trimmed source text and always satisfy `start_char < end_char`.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use ragdb_core::config::ChunkSettings;
use ragdb_core::types::{Chunk, Meta};

use crate::sentence::split_sentences;

static PARAGRAPH_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

/// Chunking strategy. Closed set, dispatched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Group whole paragraphs, sentence-splitting any oversize paragraph.
    #[default]
    Paragraph,
    /// Group sentences with trailing-sentence overlap between chunks.
    Sentence,
    /// Fixed-size windows, optionally shortened to a sentence boundary.
    Fixed,
}

impl std::str::FromStr for Strategy {
    type Err = ragdb_core::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paragraph" => Ok(Self::Paragraph),
            "sentence" => Ok(Self::Sentence),
            "fixed" => Ok(Self::Fixed),
            other => Err(ragdb_core::error::Error::InvalidConfig(format!(
                "unknown chunking strategy: {other}"
            ))),
        }
    }
}

pub struct ChunkingEngine {
    settings: ChunkSettings,
}

impl Default for ChunkingEngine {
    fn default() -> Self {
        Self::new(ChunkSettings::default())
    }
}

impl ChunkingEngine {
    pub fn new(settings: ChunkSettings) -> Self {
        Self { settings }
    }

    /// Chunk `text` with the given strategy. Empty or whitespace-only input
    /// yields an empty sequence. When `page_count > 1` each chunk gets an
    /// estimated 1-based page number clamped to `page_count`.
    pub fn chunk_text(&self, text: &str, page_count: usize, strategy: Strategy) -> Vec<Chunk> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks = match strategy {
            Strategy::Paragraph => self.chunk_by_paragraphs(text),
            Strategy::Sentence => self.chunk_by_sentences(text),
            Strategy::Fixed => self.chunk_fixed(text),
        };

        if page_count > 1 {
            assign_page_numbers(&mut chunks, text.len(), page_count);
        }

        chunks.retain(|c| c.content.trim().chars().count() >= self.settings.min_chunk_size);
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.chunk_index = i;
        }

        let avg = chunks.iter().map(Chunk::len).sum::<usize>() / chunks.len().max(1);
        debug!(chunks = chunks.len(), avg_chars = avg, "chunked text");
        chunks
    }

    /// Paragraph grouping: paragraphs are appended to the current group and
    /// the group is emitted as soon as its accumulated length exceeds
    /// `chunk_size`, so a chunk may overshoot by its final paragraph. A
    /// single paragraph longer than `chunk_size` flushes the group and is
    /// sub-chunked with the sentence strategy at its own offset.
    fn chunk_by_paragraphs(&self, text: &str) -> Vec<Chunk> {
        let paragraphs: Vec<&str> = PARAGRAPH_SPLIT
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut parts: Vec<&str> = Vec::new();
        let mut current_len = 0usize;
        let mut char_offset = 0usize;

        for para in paragraphs {
            let para_len = para.len();

            if para_len > self.settings.chunk_size {
                if !parts.is_empty() {
                    char_offset = flush_group(text, &parts, char_offset, &mut chunks);
                    parts.clear();
                    current_len = 0;
                }
                let para_start = find_from(text, para, char_offset).unwrap_or(char_offset);
                for mut sub in self.chunk_by_sentences(para) {
                    sub.start_char += para_start;
                    sub.end_char += para_start;
                    sub.chunk_index = chunks.len();
                    chunks.push(sub);
                }
                char_offset = para_start + para_len;
                continue;
            }

            parts.push(para);
            current_len += para_len + 2; // joined with "\n\n"
            if current_len > self.settings.chunk_size {
                char_offset = flush_group(text, &parts, char_offset, &mut chunks);
                parts.clear();
                current_len = 0;
            }
        }

        if !parts.is_empty() {
            flush_group(text, &parts, char_offset, &mut chunks);
        }

        chunks
    }

    /// Sentence grouping with trailing-sentence overlap. The overlap carried
    /// into the next chunk is the longest trailing run of sentences whose
    /// combined length stays within `chunk_overlap` (may undershoot, and the
    /// finalized chunk itself may overshoot `chunk_size` by one sentence).
    fn chunk_by_sentences(&self, text: &str) -> Vec<Chunk> {
        let sentences = split_sentences(text);

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut parts: Vec<String> = Vec::new();
        let mut current_len = 0usize;
        let mut char_offset = 0usize;

        for sentence in sentences {
            let sentence_len = sentence.len();

            if current_len + sentence_len > self.settings.chunk_size && !parts.is_empty() {
                let content = parts.join(" ");
                let start = find_from(text, &parts[0], char_offset).unwrap_or(char_offset);
                let end = start + content.len();
                chunks.push(make_chunk(content, chunks.len(), start, end));

                let mut overlap: Vec<String> = Vec::new();
                let mut overlap_len = 0usize;
                for part in parts.iter().rev() {
                    if overlap_len + part.len() > self.settings.chunk_overlap {
                        break;
                    }
                    overlap.insert(0, part.clone());
                    overlap_len += part.len() + 1; // +1 for the joining space
                }
                parts = overlap;
                current_len = overlap_len;
                char_offset = end.saturating_sub(overlap_len);
            }

            parts.push(sentence);
            current_len += sentence_len + 1;
        }

        if !parts.is_empty() {
            let content = parts.join(" ");
            let start = find_from(text, &parts[0], char_offset)
                .unwrap_or_else(|| text.len().saturating_sub(content.len()));
            let end = start + content.len();
            chunks.push(make_chunk(content, chunks.len(), start, end));
        }

        chunks
    }

    /// Fixed windows of `chunk_size` bytes advanced by `chunk_size -
    /// chunk_overlap`. A window whose right edge falls mid-sentence is
    /// shortened to the last sentence boundary past its midpoint.
    fn chunk_fixed(&self, text: &str) -> Vec<Chunk> {
        let size = self.settings.chunk_size;
        let overlap = self.settings.chunk_overlap;

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut start = 0usize;
        loop {
            if start + size >= text.len() {
                let content = text[start..].trim().to_string();
                chunks.push(make_chunk(content, chunks.len(), start, text.len()));
                break;
            }

            let mut end = floor_boundary(text, start + size);
            if self.settings.respect_sentences {
                if let Some(boundary) = last_sentence_break(&text[start..end]) {
                    if boundary > size / 2 {
                        end = start + boundary + 1;
                    }
                }
            }

            let content = text[start..end].trim().to_string();
            chunks.push(make_chunk(content, chunks.len(), start, end));

            let next = floor_boundary(text, end.saturating_sub(overlap));
            if next <= start {
                break;
            }
            start = next;
        }

        chunks
    }
}

fn make_chunk(content: String, index: usize, start: usize, end: usize) -> Chunk {
    Chunk {
        content,
        chunk_index: index,
        page_number: None,
        start_char: start,
        end_char: end,
        metadata: Meta::new(),
    }
}

/// Emit the pending paragraph group as one chunk. Returns the offset just
/// past the emitted content, for the next search window.
fn flush_group(text: &str, parts: &[&str], char_offset: usize, chunks: &mut Vec<Chunk>) -> usize {
    let content = parts.join("\n\n");
    let start = find_from(text, parts[0], char_offset).unwrap_or(char_offset);
    let end = start + content.len();
    chunks.push(make_chunk(content, chunks.len(), start, end));
    end
}

/// Byte offset of the last ". ", "! ", "? ", or ".\n" in `window`, pointing
/// at the punctuation character.
fn last_sentence_break(window: &str) -> Option<usize> {
    [". ", "! ", "? ", ".\n"]
        .iter()
        .filter_map(|pat| window.rfind(pat))
        .max()
}

/// `str::find` starting at `offset`, returning an absolute offset.
fn find_from(text: &str, needle: &str, offset: usize) -> Option<usize> {
    let offset = floor_boundary(text, offset.min(text.len()));
    text[offset..].find(needle).map(|p| p + offset)
}

/// Largest char boundary `<= i`.
fn floor_boundary(text: &str, mut i: usize) -> usize {
    i = i.min(text.len());
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn assign_page_numbers(chunks: &mut [Chunk], text_len: usize, page_count: usize) {
    let chars_per_page = text_len as f64 / page_count as f64;
    for chunk in chunks {
        let page = (chunk.start_char as f64 / chars_per_page) as u32 + 1;
        chunk.page_number = Some(page.min(page_count as u32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(chunk_size: usize, chunk_overlap: usize, min_chunk_size: usize) -> ChunkingEngine {
        ChunkingEngine::new(ChunkSettings {
            chunk_size,
            chunk_overlap,
            min_chunk_size,
            respect_sentences: true,
        })
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let e = ChunkingEngine::default();
        assert!(e.chunk_text("", 1, Strategy::Paragraph).is_empty());
        assert!(e.chunk_text("  \n\n  ", 1, Strategy::Sentence).is_empty());
    }

    #[test]
    fn paragraph_groups_until_size_exceeded() {
        let p1 = "a".repeat(300);
        let p2 = "b".repeat(300);
        let p3 = "c".repeat(300);
        let text = format!("{p1}\n\n{p2}\n\n{p3}");
        let chunks = engine(500, 50, 50).chunk_text(&text, 1, Strategy::Paragraph);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, format!("{p1}\n\n{p2}"));
        assert_eq!(chunks[1].content, p3);
        assert_eq!((chunks[0].start_char, chunks[0].end_char), (0, 602));
        assert_eq!((chunks[1].start_char, chunks[1].end_char), (604, 904));
    }

    #[test]
    fn oversize_paragraph_is_sentence_split() {
        let long: String = (0..30)
            .map(|i| format!("Sentence number {i} talks about routing. "))
            .collect();
        let text = format!("Short intro paragraph about networks and switches.\n\n{}", long.trim());
        let chunks = engine(200, 20, 10).chunk_text(&text, 1, Strategy::Paragraph);

        assert!(chunks.len() > 2);
        assert_eq!(chunks[0].content, "Short intro paragraph about networks and switches.");
        for c in &chunks {
            assert!(c.start_char < c.end_char);
        }
    }

    #[test]
    fn sentence_strategy_carries_overlap() {
        let text = "Alpha routers forward packets. Bravo switches learn addresses. \
                    Charlie subnets divide networks. Delta gateways translate traffic.";
        let chunks = engine(70, 40, 10).chunk_text(text, 1, Strategy::Sentence);

        assert!(chunks.len() >= 2);
        // The sentence finishing one chunk reopens the next.
        let last_of_first = chunks[0].content.split(". ").last().map(str::to_string);
        if let Some(tail) = last_of_first {
            let tail = tail.trim_end_matches('.');
            assert!(chunks[1].content.contains(tail));
        }
    }

    #[test]
    fn fixed_strategy_respects_sentence_boundaries() {
        let text = format!(
            "{}. {}",
            "x".repeat(80),
            "y".repeat(200),
        );
        let chunks = engine(100, 10, 5).chunk_text(&text, 1, Strategy::Fixed);

        // First window shortened to the boundary at offset 80 (past 50%).
        assert_eq!(chunks[0].end_char, 81);
        assert_eq!(chunks[0].content, format!("{}.", "x".repeat(80)));
    }

    #[test]
    fn indices_are_contiguous_after_filtering() {
        let text = format!(
            "{}\n\ntiny\n\n{}\n\nsmall\n\n{}",
            "a".repeat(120),
            "b".repeat(120),
            "c".repeat(120)
        );
        let chunks = engine(100, 0, 50).chunk_text(&text, 1, Strategy::Paragraph);
        assert!(!chunks.is_empty());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert!(c.content.trim().chars().count() >= 50);
        }
    }

    #[test]
    fn page_numbers_estimated_and_clamped() {
        let text = format!("{}\n\n{}", "a".repeat(300), "b".repeat(300));
        let chunks = engine(250, 0, 10).chunk_text(&text, 3, Strategy::Paragraph);
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].page_number, Some(1));
        for c in &chunks {
            let p = c.page_number.expect("page assigned when page_count > 1");
            assert!((1..=3).contains(&p));
        }
    }

    #[test]
    fn single_page_documents_have_no_page_number() {
        let text = "One paragraph that is comfortably over the minimum chunk size limit.";
        let chunks = engine(500, 50, 10).chunk_text(text, 1, Strategy::Paragraph);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_number, None);
    }
}
