use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use retrieval_core::Result;

use crate::embed_err;

/// XLM-Roberta `<pad>` id.
pub const PAD_ID: u32 = 1;

/// Encodes `texts` into `[B, T]` id and mask tensors, where `T` is the longest
/// encoding in the batch capped at `max_len`. Shorter rows are right-padded.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| embed_err(format!("tokenization failed: {e}")))?;
    let seq_len = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);

    let mut ids = Vec::with_capacity(texts.len() * seq_len);
    let mut mask = Vec::with_capacity(texts.len() * seq_len);
    for enc in &encodings {
        let n = enc.get_ids().len().min(seq_len);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        ids.extend(std::iter::repeat(PAD_ID).take(seq_len - n));
        mask.extend(std::iter::repeat(0).take(seq_len - n));
    }
    let input_ids = Tensor::from_vec(ids, (texts.len(), seq_len), device).map_err(embed_err)?;
    let attention_mask = Tensor::from_vec(mask, (texts.len(), seq_len), device).map_err(embed_err)?;
    Ok((input_ids, attention_mask))
}
