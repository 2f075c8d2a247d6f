use retrieval_core::config::Settings;
use retrieval_core::{Chunk, Embedder};
use retrieval_embed::HashedTermEmbedder;
use retrieval_cli::Snapshot;

fn build(embedder: &HashedTermEmbedder) -> Snapshot {
    let chunks = vec![Chunk::new("report.md", 0, "## Intro\nThe cat sat."), Chunk::new("report.md", 1, "## Risks\nFinancial risk is high.")];
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).unwrap();
    let mut snapshot = Snapshot::new(embedder);
    for (c, e) in chunks.into_iter().zip(embeddings) {
        snapshot.push(c, e).unwrap();
    }
    snapshot
}

#[test]
fn save_load_and_query() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/index.json");
    let embedder = HashedTermEmbedder::new(128)?;
    build(&embedder).save(&path)?;

    let loaded = Snapshot::load(&path)?;
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.embedder_id, "fallback:hashed-terms:d128");
    assert_eq!(loaded.entries[1].chunk.section_label, "## Risks");
    loaded.ensure_compatible(&embedder)?;

    let retriever = loaded.into_retriever(&Settings::default())?;
    let q = embedder.embed_one("financial risk")?;
    let hits = retriever.search("financial risk", &q, 5)?;
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk.id, "report.md:1");
    Ok(())
}

#[test]
fn other_embedder_is_refused() {
    let snapshot = build(&HashedTermEmbedder::new(128).unwrap());
    let other = HashedTermEmbedder::new(256).unwrap();
    let err = snapshot.ensure_compatible(&other).unwrap_err();
    assert!(err.to_string().contains("re-run ingest"), "{err}");
}

#[test]
fn wrong_sized_vectors_are_refused() {
    let mut snapshot = Snapshot::new(&HashedTermEmbedder::new(4).unwrap());
    assert!(snapshot.push(Chunk::new("d", 0, "x"), vec![0.0; 3]).is_err());
    assert!(snapshot.is_empty());
}

#[test]
fn missing_or_foreign_files_fail_to_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    assert!(Snapshot::load(&dir.path().join("absent.json")).is_err());

    let path = dir.path().join("future.json");
    std::fs::write(&path, r#"{"version": 99, "embedder_id": "x", "dim": 1, "entries": []}"#)?;
    let err = Snapshot::load(&path).unwrap_err();
    assert!(err.to_string().contains("version 99"), "{err}");
    Ok(())
}
