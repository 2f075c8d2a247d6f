use candle_core::{DType, Tensor};

use retrieval_core::Result;

use crate::embed_err;

/// Mean of the unmasked token states, then L2-normalized. `[B,T,H] -> [B,H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, _seq, hidden_dim) = hidden.dims3().map_err(embed_err)?;
    let pooled = pool(hidden, attention_mask, hidden_dim).map_err(embed_err)?;
    if pooled.dims() != [batch, hidden_dim] {
        return Err(embed_err(format!("pooled shape {:?}, expected [{batch}, {hidden_dim}]", pooled.dims())));
    }
    Ok(pooled)
}

fn pool(hidden: &Tensor, attention_mask: &Tensor, hidden_dim: usize) -> candle_core::Result<Tensor> {
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?;
    let mask_broadcast = match mask_3d.broadcast_as(hidden.shape()) {
        Ok(m) => m,
        Err(_) => mask_3d.repeat((1, 1, hidden_dim))?,
    };
    let sum = (hidden * &mask_broadcast)?.sum(1)?;
    // all-padding rows would divide by zero
    let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?.maximum(1f64)?;
    let mean = sum.broadcast_div(&lengths)?;
    let eps_val = match hidden.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(0)?;
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    mean.broadcast_div(&norm)
}
