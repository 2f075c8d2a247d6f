//! In-memory BM25 index.
//!
//! `score(D, Q) = Σ_t IDF(t) · f(t,D)·(k1+1) / (f(t,D) + k1·(1 - b + b·|D|/avgdl))`
//! with `IDF(t) = ln((N - n_t + 0.5)/(n_t + 0.5) + 1)`. Document frequencies and
//! the average length are maintained incrementally on `add`. Scores are
//! returned negated so that, like cosine distance, lower is better.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tantivy::tokenizer::TextAnalyzer;

use retrieval_core::config::Bm25Config;
use retrieval_core::traits::TextIndexer;
use retrieval_core::{Chunk, Result, SearchHit, SourceKind};

use crate::analyzer::{build_analyzer, tokenize};

struct Bm25Doc {
    chunk: Arc<Chunk>,
    term_freq: HashMap<String, u32>,
    len: usize,
}

pub struct Bm25Index {
    params: Bm25Config,
    analyzer: TextAnalyzer,
    docs: Vec<Bm25Doc>,
    doc_freq: HashMap<String, usize>,
    total_len: usize,
}

impl Default for Bm25Index {
    fn default() -> Self {
        Self {
            params: Bm25Config::default(),
            analyzer: build_analyzer(),
            docs: Vec::new(),
            doc_freq: HashMap::new(),
            total_len: 0,
        }
    }
}

impl Bm25Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: Bm25Config) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, ..Self::default() })
    }

    pub fn params(&self) -> Bm25Config {
        self.params
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.analyzer.clone();
        tokenize(&mut analyzer, text)
    }

    pub fn add(&mut self, text: &str, chunk: Arc<Chunk>) {
        let tokens = tokenize(&mut self.analyzer, text);
        let mut term_freq: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *term_freq.entry(token.clone()).or_insert(0) += 1;
        }
        for term in term_freq.keys() {
            *self.doc_freq.entry(term.clone()).or_insert(0) += 1;
        }
        self.total_len += tokens.len();
        self.docs.push(Bm25Doc { chunk, term_freq, len: tokens.len() });
    }

    /// Index a chunk under its own content.
    pub fn add_chunk(&mut self, chunk: Arc<Chunk>) {
        let text = chunk.content.clone();
        self.add(&text, chunk);
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn avg_doc_len(&self) -> f32 {
        if self.docs.is_empty() {
            0.0
        } else {
            self.total_len as f32 / self.docs.len() as f32
        }
    }

    /// Number of documents containing `term` (already tokenized).
    pub fn doc_freq(&self, term: &str) -> usize {
        self.doc_freq.get(term).copied().unwrap_or(0)
    }

    /// Zero for terms absent from the corpus.
    pub fn idf(&self, term: &str) -> f32 {
        let n_t = self.doc_freq(term);
        if n_t == 0 {
            return 0.0;
        }
        let n = self.docs.len() as f32;
        let n_t = n_t as f32;
        ((n - n_t + 0.5) / (n_t + 0.5) + 1.0).ln()
    }

    fn score_doc(&self, doc: &Bm25Doc, query_tokens: &[String], avgdl: f32) -> f32 {
        let Bm25Config { k1, b } = self.params;
        let length_norm = 1.0 - b + b * (doc.len as f32 / avgdl.max(f32::EPSILON));
        query_tokens
            .iter()
            .filter_map(|t| doc.term_freq.get(t).map(|&f| (t, f as f32)))
            .map(|(t, f)| self.idf(t) * f * (k1 + 1.0) / (f + k1 * length_norm))
            .sum()
    }

    /// Raw (positive, higher is better) BM25 scores for every document, in
    /// insertion order.
    pub fn scores(&self, query: &str) -> Vec<f32> {
        let tokens = self.tokenize(query);
        let avgdl = self.avg_doc_len();
        self.docs.iter().map(|d| self.score_doc(d, &tokens, avgdl)).collect()
    }

    /// Top `top_k` documents as `(chunk, -score)`, best first.
    ///
    /// Every stored document takes part, zero-score ones included. A query
    /// that tokenizes to nothing yields no hits.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        if self.docs.is_empty() || top_k == 0 {
            return vec![];
        }
        let tokens = self.tokenize(query);
        if tokens.is_empty() {
            tracing::debug!(query, "query has no searchable terms");
            return vec![];
        }
        let avgdl = self.avg_doc_len();
        let mut hits: Vec<SearchHit> = self
            .docs
            .iter()
            .map(|d| SearchHit::new(Arc::clone(&d.chunk), -self.score_doc(d, &tokens, avgdl), SourceKind::Text))
            .collect();
        // stable: equal scores keep insertion order
        hits.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        tracing::debug!(terms = tokens.len(), docs = self.docs.len(), returned = hits.len(), "bm25 search");
        hits
    }
}

impl TextIndexer for Bm25Index {
    fn add(&mut self, text: &str, chunk: Arc<Chunk>) {
        Bm25Index::add(self, text, chunk)
    }

    fn search(&self, query: &str, k: usize) -> Vec<SearchHit> {
        Bm25Index::search(self, query, k)
    }

    fn len(&self) -> usize {
        Bm25Index::len(self)
    }
}
