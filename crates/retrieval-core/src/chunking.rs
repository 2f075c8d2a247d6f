//! Chunking strategies.
//!
//! `SectionChunker` is the default: one chunk per markdown-style section.
//! `ParagraphChunker`, `SentenceChunker` and `FixedSizeChunker` cover
//! documents without headers.
//! Every strategy is a pure function of its input, keeps document order in
//! `sequence_index`, trims each chunk and never yields an empty one.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Chunk;

pub trait Chunker: Send + Sync {
    fn chunk(&self, doc_id: &str, text: &str) -> Vec<Chunk>;
    fn name(&self) -> &str;
}

fn into_chunks<I, S>(doc_id: &str, pieces: I) -> Vec<Chunk>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pieces
        .into_iter()
        .filter_map(|p| {
            let p = p.as_ref().trim();
            (!p.is_empty()).then(|| p.to_string())
        })
        .enumerate()
        .map(|(i, content)| Chunk::new(doc_id, i, content))
        .collect()
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

pub const DEFAULT_SECTION_MARKER: &str = "## ";

/// Splits before every line that starts with `marker`. Text before the first
/// marker line is its own chunk.
#[derive(Debug, Clone)]
pub struct SectionChunker {
    marker: String,
}

impl Default for SectionChunker {
    fn default() -> Self {
        Self::new(DEFAULT_SECTION_MARKER)
    }
}

impl SectionChunker {
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into() }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Raw section slices, untrimmed, in document order.
    pub fn split_sections<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sections = Vec::new();
        let mut start = 0;
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            // a marker on the very first line opens the first section rather than closing an empty one
            if offset > 0 && line.starts_with(self.marker.as_str()) {
                sections.push(&text[start..offset]);
                start = offset;
            }
            offset += line.len();
        }
        sections.push(&text[start..]);
        sections
    }
}

impl Chunker for SectionChunker {
    fn chunk(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        into_chunks(doc_id, self.split_sections(text))
    }

    fn name(&self) -> &str {
        "section"
    }
}

// ---------------------------------------------------------------------------
// Paragraphs
// ---------------------------------------------------------------------------

/// Blank-line separated paragraphs. Paragraphs above `max_words` are cut into
/// overlapping word windows.
#[derive(Debug, Clone)]
pub struct ParagraphChunker {
    pub max_words: usize,
    pub overlap_percent: f32,
}

impl Default for ParagraphChunker {
    fn default() -> Self {
        Self { max_words: 375, overlap_percent: 0.2 }
    }
}

impl ParagraphChunker {
    fn split_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let window = self.max_words.max(1);
        let overlap = ((window as f32 * self.overlap_percent) as usize).min(window - 1);
        let mut out = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + window).min(words.len());
            out.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap;
        }
        out
    }
}

impl Chunker for ParagraphChunker {
    fn chunk(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        let mut pieces = Vec::new();
        for paragraph in text.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if paragraph.split_whitespace().count() <= self.max_words {
                pieces.push(paragraph.to_string());
            } else {
                pieces.extend(self.split_with_overlap(paragraph));
            }
        }
        into_chunks(doc_id, pieces)
    }

    fn name(&self) -> &str {
        "paragraph"
    }
}

// ---------------------------------------------------------------------------
// Sentences
// ---------------------------------------------------------------------------

pub const SENTENCE_RANGE_META_KEY: &str = "sentence_range";

// terminator followed by whitespace; the whitespace run is the separator
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("sentence boundary pattern is valid"));

/// Groups of `sentences_per_chunk` consecutive sentences joined by a space.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace. Each chunk
/// records the half-open sentence span it covers under
/// [`SENTENCE_RANGE_META_KEY`], e.g. `"3-6"`.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    pub sentences_per_chunk: usize,
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self { sentences_per_chunk: 3 }
    }
}

impl SentenceChunker {
    /// Sentences in order, each keeping its terminal punctuation. Blank
    /// pieces are dropped.
    pub fn split_sentences(text: &str) -> Vec<&str> {
        let mut sentences = Vec::new();
        let mut start = 0;
        for boundary in SENTENCE_BOUNDARY.find_iter(text) {
            // the terminator is a single ASCII byte
            sentences.push(&text[start..boundary.start() + 1]);
            start = boundary.end();
        }
        sentences.push(&text[start..]);
        sentences.retain(|s| !s.trim().is_empty());
        sentences
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        let sentences = Self::split_sentences(text);
        let per_chunk = self.sentences_per_chunk.max(1);
        sentences
            .chunks(per_chunk)
            .enumerate()
            .map(|(i, group)| {
                let first = i * per_chunk;
                Chunk::new(doc_id, i, group.join(" ").trim().to_string())
                    .with_meta(SENTENCE_RANGE_META_KEY, format!("{}-{}", first, first + group.len()))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "sentence"
    }
}

// ---------------------------------------------------------------------------
// Fixed windows
// ---------------------------------------------------------------------------

/// Character windows of `chunk_chars`, each starting `chunk_chars - overlap_chars`
/// after the previous one.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    pub chunk_chars: usize,
    pub overlap_chars: usize,
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self { chunk_chars: 500, overlap_chars: 50 }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let window = self.chunk_chars.max(1);
        let step = window - self.overlap_chars.min(window - 1);
        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + window).min(chars.len());
            pieces.push(chars[start..end].iter().collect::<String>());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        into_chunks(doc_id, pieces)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}
