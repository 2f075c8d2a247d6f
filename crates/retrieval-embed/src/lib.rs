//! Embedding providers: a local transformer model and a keyword-frequency
//! fallback, chosen once at startup by [`load_embedder`].

mod device;
mod fallback;
mod model;
mod pool;
mod tokenize;

use std::fmt::Display;

use retrieval_core::config::{expand_path, EmbeddingConfig};
use retrieval_core::{Embedder, Error, Result};

pub use device::select_device;
pub use fallback::{terms, HashedTermEmbedder};
pub use model::ModelEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

/// A backend that could not be constructed.
pub(crate) fn load_err(e: impl Display) -> Error {
    Error::EmbeddingUnavailable(e.to_string())
}

/// A constructed backend that failed while embedding.
pub(crate) fn embed_err(e: impl Display) -> Error {
    Error::Embedding(e.to_string())
}

/// Builds the model embedder when `model_dir` is set and loads, otherwise the
/// hashed-terms fallback if `allow_fallback`. Fails with
/// `EmbeddingUnavailable` only when neither can be built.
pub fn load_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let model_error = match config.model_dir.as_deref() {
        Some(dir) => {
            let path = expand_path(dir);
            match ModelEmbedder::load(&path, config.max_len) {
                Ok(model) => {
                    tracing::info!(backend = model.id(), "embedding backend selected");
                    return Ok(Box::new(model));
                }
                Err(Error::EmbeddingUnavailable(reason)) => reason,
                Err(e) => e.to_string(),
            }
        }
        None => "no model_dir configured".to_string(),
    };

    if !config.allow_fallback {
        return Err(Error::EmbeddingUnavailable(format!("{model_error}; fallback disabled")));
    }
    let fallback = HashedTermEmbedder::new(config.fallback_dim)
        .map_err(|e| Error::EmbeddingUnavailable(format!("{model_error}; fallback: {e}")))?;
    tracing::warn!(
        backend = fallback.id(),
        reason = %model_error,
        "semantic embeddings unavailable, using keyword-frequency fallback"
    );
    Ok(Box::new(fallback))
}
