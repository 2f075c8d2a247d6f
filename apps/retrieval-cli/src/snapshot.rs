use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use retrieval_core::config::Settings;
use retrieval_core::{Chunk, Embedder};
use retrieval_hybrid::HybridRetriever;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to rebuild both indexes without re-embedding: the chunks
/// as indexed, their vectors, and the embedder that produced them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub embedder_id: String,
    pub dim: usize,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

impl Snapshot {
    pub fn new(embedder: &dyn Embedder) -> Self {
        Self { version: SNAPSHOT_VERSION, embedder_id: embedder.id().to_string(), dim: embedder.dim(), entries: vec![] }
    }

    pub fn push(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        if embedding.len() != self.dim {
            bail!("embedding for {} has {} dimensions, snapshot expects {}", chunk.id, embedding.len(), self.dim);
        }
        self.entries.push(SnapshotEntry { chunk, embedding });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), self).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!(path = %path.display(), chunks = self.entries.len(), embedder = %self.embedder_id, "snapshot saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening snapshot {} (run `ingest` first)", path.display()))?;
        let snapshot: Snapshot =
            serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            bail!("snapshot version {} is not supported (expected {})", snapshot.version, SNAPSHOT_VERSION);
        }
        Ok(snapshot)
    }

    /// Query vectors must come from the embedder that built the snapshot.
    pub fn ensure_compatible(&self, embedder: &dyn Embedder) -> Result<()> {
        if embedder.id() != self.embedder_id {
            bail!(
                "snapshot was built with `{}` but the active embedder is `{}`; re-run ingest",
                self.embedder_id,
                embedder.id()
            );
        }
        Ok(())
    }

    pub fn into_retriever(self, settings: &Settings) -> Result<HybridRetriever> {
        let mut retriever = HybridRetriever::with_config(settings.bm25, settings.fusion)?;
        let (chunks, embeddings): (Vec<Chunk>, Vec<Vec<f32>>) =
            self.entries.into_iter().map(|e| (e.chunk, e.embedding)).unzip();
        retriever.index_chunks(chunks, embeddings)?;
        Ok(retriever)
    }
}
