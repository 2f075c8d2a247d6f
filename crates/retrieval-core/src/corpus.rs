use std::fs;
use std::path::{Path, PathBuf};

use crate::chunking::{Chunker, SectionChunker};
use crate::error::Result;
use crate::types::Chunk;

const TEXT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// One source document after chunking.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub doc_id: String,
    pub path: PathBuf,
    pub text: String,
    pub chunks: Vec<Chunk>,
}

/// Walks a directory of plain-text documents and chunks each one.
///
/// `doc_id` is the path relative to the root, with `/` separators, so ids are
/// stable across machines.
pub struct CorpusLoader {
    chunker: Box<dyn Chunker>,
}

impl Default for CorpusLoader {
    fn default() -> Self {
        Self::new(Box::new(SectionChunker::default()))
    }
}

impl CorpusLoader {
    pub fn new(chunker: Box<dyn Chunker>) -> Self {
        Self { chunker }
    }

    pub fn chunker(&self) -> &dyn Chunker {
        self.chunker.as_ref()
    }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<LoadedDocument>> {
        self.load_directory_limited(data_dir, usize::MAX)
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<LoadedDocument>> {
        let mut files = self.list_text_files(data_dir);
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no text documents found");
            return Ok(vec![]);
        }
        if files.len() > limit {
            files.truncate(limit);
            tracing::info!(limit, "limited corpus to first files");
        }
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::debug!(file = %file_path.display(), n = file_index + 1, total = files.len(), "loading document");
            let text = self.read_file_content(file_path)?;
            let doc_id = self.doc_id_for(file_path, data_dir);
            documents.push(self.load_text(&doc_id, file_path.clone(), text));
        }
        let chunk_count: usize = documents.iter().map(|d| d.chunks.len()).sum();
        tracing::info!(
            documents = documents.len(),
            chunks = chunk_count,
            strategy = self.chunker.name(),
            "corpus loaded"
        );
        Ok(documents)
    }

    /// Chunk an in-memory document.
    pub fn load_text(&self, doc_id: &str, path: PathBuf, text: String) -> LoadedDocument {
        let chunks = self
            .chunker
            .chunk(doc_id, &text)
            .into_iter()
            .map(|c| c.with_meta("path", path.to_string_lossy()))
            .collect();
        LoadedDocument { doc_id: doc_id.to_string(), path, text, chunks }
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn doc_id_for(&self, file_path: &Path, data_dir: &Path) -> String {
        let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn list_text_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        files.sort();
        files
    }
}
