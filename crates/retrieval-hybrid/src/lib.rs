//! Hybrid retrieval: BM25 and vector search merged with reciprocal rank
//! fusion, plus the oracle-driven stages around it (re-ranking at query time,
//! contextual enrichment at index time).

pub mod enrich;
pub mod fusion;
pub mod rerank;
pub mod retriever;

pub use enrich::{enrich, ContextualEnricher, DocumentContext};
pub use fusion::{reciprocal_rank_fusion, DEFAULT_RRF_K};
pub use rerank::{parse_ranked_ids, RerankingRetriever};
pub use retriever::HybridRetriever;
