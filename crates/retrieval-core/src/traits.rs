use std::sync::Arc;

use crate::error::Result;
use crate::types::{Chunk, SearchHit};

/// Maps a batch of texts to vectors of one fixed dimension.
///
/// Output has the same length and order as `texts`. All vectors returned by
/// one embedder share `dim()`, and only vectors from the same `id()` may be
/// compared with each other.
pub trait Embedder: Send + Sync {
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| crate::Error::Embedding(format!("{} returned no vector", self.id())))
    }
}

/// Lexical index. Hits carry `SourceKind::Text` scores (lower is better).
pub trait TextIndexer {
    fn add(&mut self, text: &str, chunk: Arc<Chunk>);
    fn search(&self, query: &str, k: usize) -> Vec<SearchHit>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Vector index. Hits carry `SourceKind::Vector` scores (lower is better).
pub trait VectorIndexer {
    fn add(&mut self, embedding: Vec<f32>, chunk: Arc<Chunk>) -> Result<()>;
    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Any text-completion service: takes a prompt, returns a completion.
///
/// Implementations report every failure (transport, timeout, empty answer)
/// as `Error::Oracle`.
pub trait TextOracle: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<O: TextOracle + ?Sized> TextOracle for Arc<O> {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

impl<O: TextOracle + ?Sized> TextOracle for Box<O> {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn id(&self) -> &str {
        (**self).id()
    }
    fn dim(&self) -> usize {
        (**self).dim()
    }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}
