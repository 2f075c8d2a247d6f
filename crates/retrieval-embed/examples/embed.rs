use retrieval_core::config::Config;
use retrieval_core::logging::init_tracing;
use retrieval_embed::load_embedder;

// Embeds two strings with whichever backend the config selects.
//   APP_EMBEDDING__MODEL_DIR=../models/bge-m3 cargo run -p retrieval-embed --example embed

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    init_tracing(&settings.logging);
    let embedder = load_embedder(&settings.embedding)?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    let cos: f32 = embs[0].iter().zip(&embs[1]).map(|(a, b)| a * b).sum();
    println!("backend={} B={} dim={} cos={cos:.4}", embedder.id(), embs.len(), embedder.dim());
    Ok(())
}
