use std::cmp::Ordering;
use std::sync::Arc;

use retrieval_core::traits::VectorIndexer;
use retrieval_core::{Chunk, Error, Result, SearchHit, SourceKind};

use crate::distance::cosine_distance;

/// Brute-force cosine index. Every query scans all stored vectors, which is
/// exact and fine for corpora of a few tens of thousands of chunks.
///
/// The dimension is fixed by the first insert; later inserts and queries of a
/// different length are rejected with `DimensionMismatch`.
#[derive(Debug, Default)]
pub struct FlatIndex {
    dim: Option<usize>,
    vectors: Vec<Vec<f32>>,
    chunks: Vec<Arc<Chunk>>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sets the dimension so the first insert is checked too.
    pub fn with_dim(dim: usize) -> Self {
        Self { dim: Some(dim), ..Self::default() }
    }

    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn add(&mut self, embedding: Vec<f32>, chunk: Arc<Chunk>) -> Result<()> {
        match self.dim {
            Some(expected) if expected != embedding.len() => {
                return Err(Error::DimensionMismatch { expected, actual: embedding.len() });
            }
            Some(_) => {}
            None => {
                if embedding.is_empty() {
                    return Err(Error::InvalidInput("embedding must not be empty".into()));
                }
                self.dim = Some(embedding.len());
            }
        }
        self.vectors.push(embedding);
        self.chunks.push(chunk);
        Ok(())
    }

    /// Stored `(vector, chunk)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&[f32], &Arc<Chunk>)> {
        self.vectors.iter().map(Vec::as_slice).zip(self.chunks.iter())
    }

    /// Top `top_k` chunks by ascending cosine distance. Equal distances keep
    /// insertion order. An empty index returns no hits for any query.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if self.chunks.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }
        if let Some(expected) = self.dim {
            if expected != query.len() {
                return Err(Error::DimensionMismatch { expected, actual: query.len() });
            }
        }
        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .zip(&self.chunks)
            .map(|(v, c)| SearchHit::new(Arc::clone(c), cosine_distance(query, v), SourceKind::Vector))
            .collect();
        hits.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        tracing::debug!(scanned = self.chunks.len(), returned = hits.len(), "flat vector search");
        Ok(hits)
    }
}

impl VectorIndexer for FlatIndex {
    fn add(&mut self, embedding: Vec<f32>, chunk: Arc<Chunk>) -> Result<()> {
        FlatIndex::add(self, embedding, chunk)
    }

    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.search(query_vec, k)
    }

    fn len(&self) -> usize {
        FlatIndex::len(self)
    }
}
