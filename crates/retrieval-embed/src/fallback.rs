use std::hash::Hasher;

use twox_hash::XxHash64;

use retrieval_core::{Embedder, Error, Result};

/// Keyword-frequency embedder used when no model is available.
///
/// Each lowercased alphanumeric term is hashed (XxHash64, seed 0) into one of
/// `dim` buckets and counted; the count vector is L2-normalized. Texts that
/// share vocabulary get a positive cosine similarity, texts that share none
/// are orthogonal up to bucket collisions. Text without terms maps to the
/// zero vector.
#[derive(Debug, Clone)]
pub struct HashedTermEmbedder {
    id: String,
    dim: usize,
}

impl HashedTermEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("fallback embedding dimension must be > 0".into()));
        }
        Ok(Self { id: format!("fallback:hashed-terms:d{dim}"), dim })
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for term in terms(text) {
            v[self.bucket(&term)] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }

    pub fn bucket(&self, term: &str) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(term.as_bytes());
        (hasher.finish() % self.dim as u64) as usize
    }
}

/// Lowercased runs of alphanumeric characters or `_`.
pub fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl Embedder for HashedTermEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
