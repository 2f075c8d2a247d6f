//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_BM25__K1=1.2`). Every key has a
//! default, so an empty environment yields `Settings::default()`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunking::{
    Chunker, FixedSizeChunker, ParagraphChunker, SectionChunker, SentenceChunker, DEFAULT_SECTION_MARKER,
};
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::debug!(env = other, "no environment overlay for RUST_ENV"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Extract and validate the full typed settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bm25: Bm25Config,
    pub fusion: FusionConfig,
    pub rerank: RerankConfig,
    pub enrich: EnrichConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub oracle: OracleConfig,
    pub data: DataConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.bm25.validate()?;
        self.fusion.validate()?;
        if self.rerank.candidate_multiplier == 0 {
            return Err(Error::InvalidConfig("rerank.candidate_multiplier must be >= 1".into()));
        }
        if self.rerank.content_chars == 0 {
            return Err(Error::InvalidConfig("rerank.content_chars must be > 0".into()));
        }
        self.chunking.validate()?;
        if self.embedding.fallback_dim == 0 || self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.fallback_dim and embedding.max_len must be > 0".into()));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(Error::InvalidConfig("oracle.timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

/// BM25 tuning constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Config {
    /// Term frequency saturation.
    pub k1: f32,
    /// Length normalization, in `[0, 1]`.
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl Bm25Config {
    pub fn validate(&self) -> Result<()> {
        if !(self.k1.is_finite() && self.k1 >= 0.0) {
            return Err(Error::InvalidConfig(format!("bm25.k1 must be >= 0, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(Error::InvalidConfig(format!("bm25.b must be within [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// RRF damping constant.
    pub rrf_k: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { rrf_k: 60.0 }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.rrf_k.is_finite() && self.rrf_k > 0.0) {
            return Err(Error::InvalidConfig(format!("fusion.rrf_k must be > 0, got {}", self.rrf_k)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Candidates fetched per requested result before re-ranking.
    pub candidate_multiplier: usize,
    /// Characters of each candidate shown to the oracle.
    pub content_chars: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self { candidate_multiplier: 2, content_chars: 500 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Documents up to this many characters are sent whole as context.
    pub full_document_chars: usize,
    /// Opening chunks included in the bounded context of large documents.
    pub starter_chunks: usize,
    /// Chunks immediately preceding the target included in the bounded context.
    pub nearby_chunks: usize,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self { full_document_chars: 20_000, starter_chunks: 2, nearby_chunks: 2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    Section,
    Paragraph,
    Sentence,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: ChunkingStrategy,
    pub section_marker: String,
    pub max_words: usize,
    pub overlap_percent: f32,
    pub sentences_per_chunk: usize,
    pub chunk_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::Section,
            section_marker: DEFAULT_SECTION_MARKER.to_string(),
            max_words: 375,
            overlap_percent: 0.2,
            sentences_per_chunk: 3,
            chunk_chars: 500,
            overlap_chars: 50,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.section_marker.is_empty() {
            return Err(Error::InvalidConfig("chunking.section_marker must not be empty".into()));
        }
        if self.max_words == 0 || self.chunk_chars == 0 || self.sentences_per_chunk == 0 {
            return Err(Error::InvalidConfig(
                "chunking.max_words, chunking.sentences_per_chunk and chunking.chunk_chars must be > 0".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.overlap_percent) {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap_percent must be within [0, 1), got {}",
                self.overlap_percent
            )));
        }
        Ok(())
    }

    pub fn build(&self) -> Box<dyn Chunker> {
        match self.strategy {
            ChunkingStrategy::Section => Box::new(SectionChunker::new(self.section_marker.clone())),
            ChunkingStrategy::Paragraph => Box::new(ParagraphChunker {
                max_words: self.max_words,
                overlap_percent: self.overlap_percent,
            }),
            ChunkingStrategy::Sentence => Box::new(SentenceChunker { sentences_per_chunk: self.sentences_per_chunk }),
            ChunkingStrategy::Fixed => Box::new(FixedSizeChunker {
                chunk_chars: self.chunk_chars,
                overlap_chars: self.overlap_chars,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Directory holding `tokenizer.json`, `config.json` and `pytorch_model.bin`.
    pub model_dir: Option<String>,
    pub allow_fallback: bool,
    pub fallback_dim: usize,
    pub max_len: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { model_dir: None, allow_fallback: true, fallback_dim: 512, max_len: 256 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Program and arguments; the prompt is written to its stdin.
    pub command: Option<Vec<String>>,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self { command: None, timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub docs_dir: String,
    pub snapshot_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { docs_dir: "data/docs".to_string(), snapshot_path: "data/index.json".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
