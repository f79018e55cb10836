use anyhow::{ensure, Result};
use candle_core::{DType, Tensor};

/// Mean over unmasked tokens followed by L2 normalization: `[B,T,H] -> [B,H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let dims = hidden.dims();
    ensure!(dims.len() == 3, "hidden shape must be [B,T,H], got {:?}", dims);
    let (batch, hidden_dim) = (dims[0], dims[2]);

    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_broadcast = mask.unsqueeze(2)?.broadcast_as(hidden.shape())?;
    let sum = (hidden * &mask_broadcast)?.sum(1)?;
    let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?;
    let mean = sum.broadcast_div(&lengths)?;
    let eps_val = match hidden.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(0)?;
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    let normalized = mean.broadcast_div(&norm)?;
    ensure!(normalized.dims() == [batch, hidden_dim], "pooled shape {:?}", normalized.dims());
    Ok(normalized)
}
