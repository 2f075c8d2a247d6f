use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use retrieval_core::config::{Bm25Config, FusionConfig};
use retrieval_core::traits::{Embedder, TextIndexer, VectorIndexer};
use retrieval_core::{Chunk, ChunkId, Error, Result, SearchHit};
use retrieval_text::Bm25Index;
use retrieval_vector::FlatIndex;

use crate::fusion::reciprocal_rank_fusion;

/// Owns a lexical and a vector index over the same chunks and answers
/// queries with their RRF-fused ranking.
///
/// Every chunk is stored once as an `Arc<Chunk>` shared by both indexes;
/// fusion matches hits on `chunk.id`, so a repeated id is rejected on insert.
pub struct HybridRetriever<TI = Bm25Index, VI = FlatIndex> {
    text: TI,
    vector: VI,
    ids: HashSet<ChunkId>,
    rrf_k: f32,
}

impl HybridRetriever {
    pub fn new() -> Self {
        Self { text: Bm25Index::new(), vector: FlatIndex::new(), ids: HashSet::new(), rrf_k: FusionConfig::default().rrf_k }
    }

    pub fn with_config(bm25: Bm25Config, fusion: FusionConfig) -> Result<Self> {
        Self::with_indexes(Bm25Index::with_params(bm25)?, FlatIndex::new(), fusion)
    }
}

impl Default for HybridRetriever {
    fn default() -> Self {
        Self::new()
    }
}

impl<TI, VI> HybridRetriever<TI, VI>
where
    TI: TextIndexer,
    VI: VectorIndexer,
{
    pub fn with_indexes(text: TI, vector: VI, fusion: FusionConfig) -> Result<Self> {
        fusion.validate()?;
        Ok(Self { text, vector, ids: HashSet::new(), rrf_k: fusion.rrf_k })
    }

    pub fn text_index(&self) -> &TI {
        &self.text
    }

    pub fn vector_index(&self) -> &VI {
        &self.vector
    }

    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    /// Adds one chunk to both indexes. `text` is what BM25 sees; it may differ
    /// from `chunk.content` (e.g. enriched text). A repeated id or a dimension
    /// error leaves both indexes untouched.
    pub fn add(&mut self, text: &str, embedding: Vec<f32>, chunk: Arc<Chunk>) -> Result<()> {
        if self.ids.contains(&chunk.id) {
            return Err(duplicate_id(&chunk.id));
        }
        self.vector.add(embedding, Arc::clone(&chunk))?;
        self.ids.insert(chunk.id.clone());
        self.text.add(text, chunk);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Indexes chunks under their own content. `embeddings[i]` belongs to
    /// `chunks[i]`. Ids are checked for the whole batch before any insert.
    pub fn index_chunks(&mut self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(Error::InvalidInput(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        self.check_new_ids(&chunks)?;
        let started = Instant::now();
        let count = chunks.len();
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            let chunk = Arc::new(chunk);
            let text = chunk.content.clone();
            self.add(&text, embedding, chunk)?;
        }
        tracing::info!(chunks = count, total = self.len(), elapsed_ms = started.elapsed().as_millis() as u64, "indexed chunks");
        Ok(count)
    }

    /// Embeds all chunk contents in one batch, then indexes them.
    pub fn index_with(&mut self, chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<usize> {
        self.check_new_ids(&chunks)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts)?;
        self.index_chunks(chunks, embeddings)
    }

    fn check_new_ids(&self, chunks: &[Chunk]) -> Result<()> {
        let mut batch: HashSet<&str> = HashSet::with_capacity(chunks.len());
        for chunk in chunks {
            if self.ids.contains(&chunk.id) || !batch.insert(chunk.id.as_str()) {
                return Err(duplicate_id(&chunk.id));
            }
        }
        Ok(())
    }

    /// Top `top_k` chunks by fused score. Each sub-index is asked for `top_k`
    /// results independently.
    pub fn search(&self, query: &str, query_embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Ok(vec![]);
        }
        let vector_hits = self.vector.search_vec(query_embedding, top_k)?;
        let text_hits = self.text.search(query, top_k);
        let mut fused = reciprocal_rank_fusion(&[vector_hits, text_hits], self.rrf_k);
        fused.truncate(top_k);
        tracing::debug!(query, top_k, returned = fused.len(), "hybrid search");
        Ok(fused)
    }

    /// Like [`search`](Self::search) but only chunks whose `doc_id` equals
    /// `doc_id` take part. Both sub-rankings are computed over the whole index
    /// and filtered before fusion, so ranks are positions among that
    /// document's chunks.
    pub fn search_in_document(
        &self,
        query: &str,
        query_embedding: &[f32],
        top_k: usize,
        doc_id: &str,
    ) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Ok(vec![]);
        }
        let in_doc = |hits: Vec<SearchHit>| -> Vec<SearchHit> {
            hits.into_iter().filter(|h| h.chunk.doc_id == doc_id).take(top_k).collect()
        };
        let vector_hits = in_doc(self.vector.search_vec(query_embedding, self.vector.len())?);
        let text_hits = in_doc(self.text.search(query, self.text.len()));
        let mut fused = reciprocal_rank_fusion(&[vector_hits, text_hits], self.rrf_k);
        fused.truncate(top_k);
        tracing::debug!(query, doc_id, top_k, returned = fused.len(), "document-scoped hybrid search");
        Ok(fused)
    }
}

fn duplicate_id(id: &str) -> Error {
    Error::InvalidInput(format!("chunk id {id:?} is already indexed"))
}
