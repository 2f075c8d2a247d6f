use std::collections::HashSet;

use retrieval_core::chunking::{Chunker, SectionChunker};
use retrieval_core::config::{Bm25Config, FusionConfig};
use retrieval_core::{Chunk, Embedder, Error, SourceKind};
use retrieval_embed::HashedTermEmbedder;
use retrieval_hybrid::HybridRetriever;

const CORPUS: &[&str] = &[
    "## Intro\nThe cat sat.",
    "## Risks\nFinancial risk is high.",
];

fn build(doc_id: &str, texts: &[&str], embedder: &HashedTermEmbedder) -> HybridRetriever {
    let chunks: Vec<Chunk> = texts.iter().enumerate().map(|(i, t)| Chunk::new(doc_id, i, *t)).collect();
    let mut retriever = HybridRetriever::new();
    retriever.index_with(chunks, embedder).unwrap();
    retriever
}

#[test]
fn risks_section_ranks_first_end_to_end() {
    let embedder = HashedTermEmbedder::new(512).unwrap();
    let retriever = build("report", CORPUS, &embedder);

    let bm25 = retriever.text_index().search("financial risk", 2);
    assert_eq!(bm25[0].chunk.section_label, "## Risks");

    let q = embedder.embed_one("financial risk").unwrap();
    let fused = retriever.search("financial risk", &q, 2).unwrap();
    assert_eq!(fused[0].chunk.section_label, "## Risks");
    assert_eq!(fused[0].source, SourceKind::Fused);
    assert!(fused[0].score >= fused[1].score);
    // first in both lists: 2 / (60 + 1)
    assert!((fused[0].score - 2.0 / 61.0).abs() < 1e-6);
}

#[test]
fn empty_corpus_returns_empty() {
    let embedder = HashedTermEmbedder::new(64).unwrap();
    let retriever = HybridRetriever::new();
    assert!(retriever.is_empty());
    let q = embedder.embed_one("anything").unwrap();
    assert!(retriever.search("anything", &q, 5).unwrap().is_empty());
    assert!(retriever.search_in_document("anything", &q, 5, "x").unwrap().is_empty());
}

#[test]
fn top_k_beyond_corpus_returns_each_chunk_once() {
    let embedder = HashedTermEmbedder::new(256).unwrap();
    let texts = ["## A\nalpha", "## B\nbeta", "## C\ngamma delta"];
    let retriever = build("doc", &texts, &embedder);
    let q = embedder.embed_one("beta").unwrap();
    let hits = retriever.search("beta", &q, 100).unwrap();
    assert_eq!(hits.len(), texts.len());
    let unique: HashSet<&str> = hits.iter().map(|h| h.id()).collect();
    assert_eq!(unique.len(), texts.len(), "a chunk in both lists is fused once");
    assert!(retriever.search("beta", &q, 0).unwrap().is_empty());
}

#[test]
fn fused_size_is_bounded_by_top_k_and_union() {
    let embedder = HashedTermEmbedder::new(256).unwrap();
    let texts: Vec<String> = (0..12).map(|i| format!("## Part {i}\nsection {i} covers topic{}", i % 4)).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let retriever = build("doc", &refs, &embedder);

    for (query, k) in [("topic1", 3), ("section covers", 5), ("zzz", 4), ("", 2)] {
        let q = embedder.embed_one(query).unwrap();
        let vector = retriever.vector_index().search(&q, k).unwrap();
        let text = retriever.text_index().search(query, k);
        let union: HashSet<&str> = vector.iter().chain(&text).map(|h| h.id()).collect();
        let fused = retriever.search(query, &q, k).unwrap();
        assert!(fused.len() <= k, "{query}");
        assert!(fused.len() <= union.len(), "{query}");
        assert!(fused.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

#[test]
fn top_of_both_lists_is_top_of_fusion() {
    let embedder = HashedTermEmbedder::new(512).unwrap();
    let texts = [
        "## Revenue\nQuarterly revenue grew on strong demand.",
        "## Costs\nOperating costs fell.",
        "## Outlook\nRevenue outlook remains cautious, costs stable.",
        "## Team\nHiring continued.",
    ];
    let retriever = build("q3", &texts, &embedder);
    for query in ["revenue", "costs", "hiring", "revenue outlook"] {
        let q = embedder.embed_one(query).unwrap();
        let v = retriever.vector_index().search(&q, 4).unwrap();
        let t = retriever.text_index().search(query, 4);
        let fused = retriever.search(query, &q, 4).unwrap();
        if v[0].id() == t[0].id() {
            assert_eq!(fused[0].id(), v[0].id(), "{query}");
        }
    }
}

#[test]
fn empty_query_text_falls_back_to_vector_ranking() {
    let embedder = HashedTermEmbedder::new(256).unwrap();
    let retriever = build("doc", CORPUS, &embedder);
    let q = embedder.embed_one("cat").unwrap();
    let hits = retriever.search("?!", &q, 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.section_label, "## Intro");
}

#[test]
fn document_scoped_search_only_returns_that_document() {
    let embedder = HashedTermEmbedder::new(256).unwrap();
    let mut retriever = HybridRetriever::new();
    let a: Vec<Chunk> = ["## Risk\nmarket risk", "## Other\nnothing here"]
        .iter()
        .enumerate()
        .map(|(i, t)| Chunk::new("a.md", i, *t))
        .collect();
    let b: Vec<Chunk> = ["## Risk\nrisk risk risk", "## More\nrisk appetite"]
        .iter()
        .enumerate()
        .map(|(i, t)| Chunk::new("b.md", i, *t))
        .collect();
    retriever.index_with(a, &embedder).unwrap();
    retriever.index_with(b, &embedder).unwrap();
    assert_eq!(retriever.len(), 4);

    let q = embedder.embed_one("risk").unwrap();
    let hits = retriever.search_in_document("risk", &q, 10, "a.md").unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.chunk.doc_id == "a.md"));
    assert_eq!(hits[0].id(), "a.md:0");

    let one = retriever.search_in_document("risk", &q, 1, "b.md").unwrap();
    assert_eq!(one.len(), 1);
    assert!(retriever.search_in_document("risk", &q, 5, "missing.md").unwrap().is_empty());
}

#[test]
fn mismatched_inputs_are_rejected() {
    let embedder = HashedTermEmbedder::new(8).unwrap();
    let mut retriever = HybridRetriever::new();
    let err = retriever.index_chunks(vec![Chunk::new("d", 0, "x")], vec![]).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    retriever.index_with(vec![Chunk::new("d", 0, "alpha")], &embedder).unwrap();
    let err = retriever.search("alpha", &[1.0, 0.0], 3).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 8, actual: 2 }));

    let err = retriever.index_chunks(vec![Chunk::new("d", 1, "beta")], vec![vec![1.0; 4]]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
    assert_eq!(retriever.text_index().len(), 1, "failed insert leaves BM25 untouched");
}

#[test]
fn configured_fusion_and_bm25() {
    let embedder = HashedTermEmbedder::new(128).unwrap();
    let mut retriever =
        HybridRetriever::with_config(Bm25Config { k1: 1.2, b: 0.5 }, FusionConfig { rrf_k: 10.0 }).unwrap();
    retriever.index_with(vec![Chunk::new("d", 0, "alpha beta")], &embedder).unwrap();
    let q = embedder.embed_one("alpha").unwrap();
    let hits = retriever.search("alpha", &q, 1).unwrap();
    assert!((hits[0].score - 2.0 / 11.0).abs() < 1e-6);

    assert!(HybridRetriever::with_config(Bm25Config::default(), FusionConfig { rrf_k: 0.0 }).is_err());
}

#[test]
fn repeated_chunk_ids_are_rejected_before_indexing() {
    let embedder = HashedTermEmbedder::new(256).unwrap();
    let chunker = SectionChunker::default();
    let mut retriever = HybridRetriever::new();

    // each string chunked under the same doc id yields "corpus:0" twice
    retriever.index_with(chunker.chunk("corpus", CORPUS[0]), &embedder).unwrap();
    let err = retriever.index_with(chunker.chunk("corpus", CORPUS[1]), &embedder).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(ref m) if m.contains("corpus:0")), "{err:?}");
    assert_eq!(retriever.len(), 1);
    assert_eq!(retriever.text_index().len(), 1);

    let dup = vec![Chunk::new("d", 0, "alpha"), Chunk::new("d", 0, "beta")];
    assert!(matches!(retriever.index_with(dup, &embedder), Err(Error::InvalidInput(_))));
    assert_eq!(retriever.len(), 1, "a batch with an inner repeat inserts nothing");

    let q = embedder.embed_one("x").unwrap();
    let err = retriever.add("The cat sat.", q, std::sync::Arc::new(Chunk::new("corpus", 0, "x"))).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(retriever.contains("corpus:0"));

    // distinct ids over the same corpus keep both chunks
    let mut retriever = HybridRetriever::new();
    for (i, text) in CORPUS.iter().enumerate() {
        retriever.index_with(chunker.chunk(&format!("corpus-{i}"), text), &embedder).unwrap();
    }
    let q = embedder.embed_one("financial risk").unwrap();
    let hits = retriever.search("financial risk", &q, 10).unwrap();
    assert_eq!(hits.len(), CORPUS.len());
    assert_eq!(hits[0].chunk.section_label, "## Risks");
}
