//! Exact nearest-neighbour search over chunk embeddings.

pub mod distance;
pub mod flat;

pub use distance::{cosine_distance, cosine_similarity};
pub use flat::FlatIndex;
