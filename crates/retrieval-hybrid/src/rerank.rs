use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use retrieval_core::config::RerankConfig;
use retrieval_core::traits::{TextIndexer, TextOracle, VectorIndexer};
use retrieval_core::{Result, SearchHit};
use retrieval_text::Bm25Index;
use retrieval_vector::FlatIndex;

use crate::retriever::HybridRetriever;

/// Hybrid retrieval followed by an oracle that reorders the shortlist.
///
/// The oracle sees `candidate_multiplier × top_k` fused candidates labelled
/// `doc_1..doc_n` and answers with those labels in relevance order. Any
/// oracle problem leaves the fused order in place.
pub struct RerankingRetriever<TI = Bm25Index, VI = FlatIndex> {
    retriever: HybridRetriever<TI, VI>,
    oracle: Option<Arc<dyn TextOracle>>,
    config: RerankConfig,
}

impl<TI, VI> RerankingRetriever<TI, VI>
where
    TI: TextIndexer,
    VI: VectorIndexer,
{
    pub fn new(retriever: HybridRetriever<TI, VI>, oracle: Option<Arc<dyn TextOracle>>) -> Self {
        Self { retriever, oracle, config: RerankConfig::default() }
    }

    pub fn with_config(mut self, config: RerankConfig) -> Self {
        self.config = config;
        self
    }

    pub fn retriever(&self) -> &HybridRetriever<TI, VI> {
        &self.retriever
    }

    /// Fused candidates reordered by the oracle, truncated to `top_k`. Scores
    /// are the candidates' fused scores. Only index errors are returned.
    pub fn search_with_reranking(&self, query: &str, query_embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let fetch = top_k.saturating_mul(self.config.candidate_multiplier.max(1));
        let candidates = self.retriever.search(query, query_embedding, fetch)?;
        let mut ranked = rerank(self.oracle.as_deref(), query, candidates, self.config.content_chars);
        ranked.truncate(top_k);
        Ok(ranked)
    }
}

/// Asks `oracle` to order `candidates` for `query`. Always returns a
/// permutation of `candidates`; without an oracle, or when it fails or its
/// answer holds no list, the input order is kept.
pub fn rerank(
    oracle: Option<&dyn TextOracle>,
    query: &str,
    candidates: Vec<SearchHit>,
    content_chars: usize,
) -> Vec<SearchHit> {
    if candidates.len() < 2 {
        return candidates;
    }
    let Some(oracle) = oracle else {
        tracing::debug!("no oracle configured, keeping hybrid order");
        return candidates;
    };
    let prompt = rerank_prompt(query, &candidates, content_chars);
    let answer = match oracle.complete(&prompt) {
        Ok(answer) => answer,
        Err(e) => {
            tracing::warn!(error = %e, "re-ranking failed, keeping hybrid order");
            return candidates;
        }
    };
    match parse_ranked_ids(&answer) {
        Some(ids) => {
            tracing::debug!(candidates = candidates.len(), ranked = ids.len(), "re-ranked by oracle");
            apply_ranking(candidates, &ids)
        }
        None => {
            tracing::warn!(answer = %truncate_chars(&answer, 200), "unparseable re-ranking answer, keeping hybrid order");
            candidates
        }
    }
}

/// Candidate label for the 0-based position `i`.
pub fn candidate_id(i: usize) -> String {
    format!("doc_{}", i + 1)
}

pub fn format_candidates(candidates: &[SearchHit], content_chars: usize) -> String {
    candidates
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let section = if hit.chunk.section_label.is_empty() {
                format!("Document {}", i + 1)
            } else {
                hit.chunk.section_label.clone()
            };
            format!(
                "<document id=\"{}\">\n  <section>{}</section>\n  <content>{}</content>\n</document>",
                candidate_id(i),
                section,
                truncate_chars(&hit.chunk.content, content_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn rerank_prompt(query: &str, candidates: &[SearchHit], content_chars: usize) -> String {
    format!(
        "You are a document relevance expert. Analyze the user's query and the retrieved documents, \
then return the document IDs in order of decreasing relevance.

User Query: \"{query}\"

Retrieved Documents:
{docs}

Task: Return a JSON list of document IDs in order of decreasing relevance (most relevant first).
Return ONLY a valid JSON array with no additional text.

Example format: [\"doc_2\", \"doc_1\", \"doc_3\"]

Your response (JSON array only):",
        docs = format_candidates(candidates, content_chars)
    )
}

/// Extracts the ranked ids from an oracle answer.
///
/// The whole answer is tried as JSON first, then the first well-formed JSON
/// array found in it, so prose or code fences around the list are fine.
/// Entries are normalized to `doc_N`: `"doc_2"`, `"2"` and `2` are the same
/// id. Entries of any other shape are skipped. `None` when no array is found.
pub fn parse_ranked_ids(answer: &str) -> Option<Vec<String>> {
    let trimmed = answer.trim();
    let values = serde_json::from_str::<Vec<Value>>(trimmed).ok().or_else(|| first_json_array(trimmed))?;
    Some(values.iter().filter_map(normalize_id).collect())
}

fn first_json_array(text: &str) -> Option<Vec<Value>> {
    text.match_indices('[').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..]).into_iter::<Vec<Value>>().next()?.ok()
    })
}

fn normalize_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<usize>() {
                Ok(n) => Some(format!("doc_{n}")),
                Err(_) => Some(s.to_string()),
            }
        }
        Value::Number(n) => n.as_u64().map(|n| format!("doc_{n}")),
        _ => None,
    }
}

/// Orders `candidates` by `ranked` ids (`doc_1` is `candidates[0]`). Unknown
/// and repeated ids are ignored; candidates the ranking leaves out follow in
/// their original order.
pub fn apply_ranking(candidates: Vec<SearchHit>, ranked: &[String]) -> Vec<SearchHit> {
    let n = candidates.len();
    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut seen: HashSet<usize> = HashSet::new();
    for id in ranked {
        let Some(pos) = id.strip_prefix("doc_").and_then(|n| n.parse::<usize>().ok()) else { continue };
        if pos == 0 || pos > n {
            continue;
        }
        if seen.insert(pos - 1) {
            order.push(pos - 1);
        }
    }
    order.extend((0..n).filter(|i| !seen.contains(i)));

    let mut slots: Vec<Option<SearchHit>> = candidates.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }

    #[test]
    fn first_array_skips_non_json_brackets() {
        let v = first_json_array("see [note] then [\"doc_1\"]").unwrap();
        assert_eq!(v, vec![Value::String("doc_1".into())]);
        assert!(first_json_array("no list").is_none());
    }
}
