use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No embedding backend available: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Oracle failure: {0}")]
    Oracle(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
