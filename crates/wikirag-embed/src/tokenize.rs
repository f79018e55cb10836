use anyhow::{anyhow, ensure, Result};
use candle_core::{Device, Tensor};
use tokenizers::{Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Token tensors for one batch, all shaped `[B,T]` with `u32` values.
pub struct TokenBatch {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Truncate every sequence (or sequence pair) to `max_len` and pad each batch
/// to its longest member.
pub fn configure(tokenizer: &mut Tokenizer, max_len: usize) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
    tokenizer.with_padding(Some(PaddingParams { strategy: PaddingStrategy::BatchLongest, ..Default::default() }));
    Ok(())
}

pub fn to_batch(encodings: &[Encoding], device: &Device) -> Result<TokenBatch> {
    let batch = encodings.len();
    let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
    let mut ids = Vec::with_capacity(batch * seq_len);
    let mut type_ids = Vec::with_capacity(batch * seq_len);
    let mut mask = Vec::with_capacity(batch * seq_len);
    for enc in encodings {
        ensure!(enc.get_ids().len() == seq_len, "encodings are not padded to a common length");
        ids.extend_from_slice(enc.get_ids());
        type_ids.extend_from_slice(enc.get_type_ids());
        mask.extend_from_slice(enc.get_attention_mask());
    }
    Ok(TokenBatch {
        input_ids: Tensor::from_vec(ids, (batch, seq_len), device)?,
        token_type_ids: Tensor::from_vec(type_ids, (batch, seq_len), device)?,
        attention_mask: Tensor::from_vec(mask, (batch, seq_len), device)?,
    })
}
