use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use retrieval_core::{Embedder, Result};

use crate::device::select_device;
use crate::{embed_err, load_err};
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;

const BATCH_SIZE: usize = 16;

/// Sentence embeddings from a local XLM-Roberta checkpoint (BGE-M3 and
/// friends): masked mean pooling over the last hidden layer, L2-normalized.
///
/// The model directory must contain `tokenizer.json`, `config.json` and either
/// `model.safetensors` or `pytorch_model.bin`.
pub struct ModelEmbedder {
    id: String,
    dim: usize,
    max_len: usize,
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl ModelEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let started = Instant::now();
        let device = select_device();

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| load_err(format!("failed to load tokenizer from {}: {e}", tokenizer_path.display())))?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| load_err(format!("failed to read {}: {e}", config_path.display())))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw)
            .map_err(|e| load_err(format!("invalid model config {}: {e}", config_path.display())))?;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(load_err)?;

        let name = model_dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "model".into());
        let dim = config.hidden_size;
        tracing::info!(
            model = %model_dir.display(),
            dim,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedding model loaded"
        );
        Ok(Self { id: format!("model:{name}:d{dim}"), dim, max_len: max_len.max(1), model, tokenizer, device })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like().map_err(embed_err)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)
            .map_err(embed_err)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        to_rows(&pooled)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return candle_core::safetensors::load(&safetensors, device).map_err(load_err);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    let tensors = candle_core::pickle::read_all(&pickle)
        .map_err(|e| load_err(format!("failed to read weights {}: {e}", pickle.display())))?;
    Ok(tensors.into_iter().collect())
}

fn to_rows(pooled: &Tensor) -> Result<Vec<Vec<f32>>> {
    pooled
        .to_device(&Device::Cpu)
        .and_then(|t| t.to_dtype(DType::F32))
        .and_then(|t| t.to_vec2::<f32>())
        .map_err(embed_err)
}

impl Embedder for ModelEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let started = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_SIZE) {
            out.extend(self.embed_chunk(chunk)?);
        }
        tracing::debug!(texts = texts.len(), elapsed_ms = started.elapsed().as_millis() as u64, "model embed batch");
        Ok(out)
    }
}
