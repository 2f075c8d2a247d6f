//! retrieval-core
//!
//! Shared data model, error taxonomy and seam traits for the hybrid retrieval
//! workspace, plus the pieces every other crate needs: chunking, corpus
//! loading, configuration and logging setup.

pub mod chunking;
pub mod config;
pub mod corpus;
pub mod error;
pub mod logging;
pub mod oracle;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{Embedder, TextIndexer, TextOracle, VectorIndexer};
pub use types::{Chunk, ChunkId, Meta, SearchHit, SourceKind};
