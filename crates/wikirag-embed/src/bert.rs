use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::collections::HashMap;
use tokenizers::Tokenizer;

use crate::hub::ModelFiles;

/// Encoder weights plus the builder rooted at the encoder's prefix, so heads
/// (pooler, classifier) can be loaded next to it.
pub(crate) struct LoadedBert {
    pub model: BertModel,
    pub config: BertConfig,
    pub root: VarBuilder<'static>,
    /// `Some("bert")` for task checkpoints (`bert.encoder...`), `None` for bare encoders.
    pub prefix: Option<&'static str>,
}

pub(crate) fn load_bert(files: &ModelFiles, device: &Device) -> Result<LoadedBert> {
    let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&files.config)?)
        .with_context(|| format!("parsing {}", files.config.display()))?;
    tracing::debug!(
        "BERT config: hidden_size={}, layers={}, heads={}",
        config.hidden_size, config.num_hidden_layers, config.num_attention_heads
    );
    let root = if files.is_safetensors() {
        // SAFETY: the file is memory-mapped read-only and not modified while the model lives.
        unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DType::F32, device)? }
    } else {
        let weights = candle_core::pickle::read_all(&files.weights)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        VarBuilder::from_tensors(weights_map, DType::F32, device)
    };
    let prefix = root.contains_tensor("bert.embeddings.word_embeddings.weight").then_some("bert");
    let encoder_vb = match prefix { Some(p) => root.pp(p), None => root.clone() };
    let model = BertModel::load(encoder_vb, &config).context("Failed to initialize BERT model from weights")?;
    tracing::info!("Loaded BERT model: {} layers, {} hidden size", config.num_hidden_layers, config.hidden_size);
    Ok(LoadedBert { model, config, root, prefix })
}

pub(crate) fn load_tokenizer(files: &ModelFiles, max_len: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
        .map_err(|e| anyhow::anyhow!("Failed to load tokenizer from {}: {}", files.tokenizer.display(), e))?;
    crate::tokenize::configure(&mut tokenizer, max_len)?;
    Ok(tokenizer)
}
