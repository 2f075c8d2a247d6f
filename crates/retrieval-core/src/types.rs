//! Domain types shared by the lexical, vector and hybrid engines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type ChunkId = String;
pub type Meta = BTreeMap<String, String>;

/// An immutable unit of retrievable text.
///
/// - `id`: stable identity, `"{doc_id}:{sequence_index}"` for chunks produced
///   by the chunkers in this crate. Fusion keys on it.
/// - `doc_id`: identity of the source document (relative path or caller id)
/// - `section_label`: first line of the chunk, usually its header
/// - `content`: the text payload
/// - `sequence_index`: position within the source document
/// - `meta`: caller-controlled key/value data carried through to results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub section_label: String,
    pub content: String,
    pub sequence_index: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Meta,
}

impl Chunk {
    pub fn new(doc_id: &str, sequence_index: usize, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: format!("{doc_id}:{sequence_index}"),
            doc_id: doc_id.to_string(),
            section_label: section_label_of(&content),
            content,
            sequence_index,
            meta: Meta::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Same identity and label, different text. Used when a preprocessing
    /// stage rewrites the indexed text of a chunk.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self { content: content.into(), ..self.clone() }
    }
}

/// First non-empty line, trimmed. Empty for blank text.
pub fn section_label_of(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Indicates which stage produced a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    /// Cosine distance, lower is better.
    Vector,
    /// Negated BM25 score, lower is better.
    Text,
    /// Reciprocal rank fusion score, higher is better.
    Fused,
}

/// A ranked result. `chunk` is shared with the index that produced it.
///
/// Scores are only comparable between hits of the same `source`.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: Arc<Chunk>,
    pub score: f32,
    pub source: SourceKind,
}

impl SearchHit {
    pub fn new(chunk: Arc<Chunk>, score: f32, source: SourceKind) -> Self {
        Self { chunk, score, source }
    }

    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}
