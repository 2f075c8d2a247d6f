//! retrieval-text
//!
//! Lexical (BM25) index over chunk text. Tokenization reuses Tantivy's
//! analyzer pipeline; scoring and term statistics live in memory.

pub mod analyzer;
pub mod bm25;

pub use bm25::Bm25Index;
