//! Cross-encoder relevance scoring: the query and a candidate are encoded
//! together and a classification head emits one logit per pair.

use anyhow::{anyhow, Result};
use candle_core::{Device, IndexOp};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::BertModel;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokenizers::{EncodeInput, Tokenizer};

use wikirag_core::config::{ModelSettings, RerankSettings};
use wikirag_core::error::{Error, Stage};
use wikirag_core::traits::RelevanceScorer;

use crate::{bert, device, env_flag, hub, normalized_terms, tokenize};

/// Only the head size is read from `config.json`; the encoder config is parsed separately.
#[derive(Debug, Default, Deserialize)]
struct HeadConfig {
    #[serde(default)]
    id2label: Option<HashMap<String, String>>,
}

/// BERT sequence-classification checkpoint (encoder + pooler + classifier),
/// e.g. `cross-encoder/ms-marco-MiniLM-L-12-v2`.
pub struct CrossEncoder {
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
}

impl CrossEncoder {
    pub fn load(settings: &RerankSettings, models: &ModelSettings) -> Result<Self> {
        let device = device::select_device();
        tracing::info!("Loading reranking model {}...", settings.model);
        let files = hub::resolve_model_files(&settings.model, &models.dir)?;
        let head: HeadConfig = serde_json::from_str(&std::fs::read_to_string(&files.config)?).unwrap_or_default();
        let num_labels = head.id2label.map_or(1, |m| m.len().max(1));
        let tokenizer = bert::load_tokenizer(&files, settings.max_len)?;
        let loaded = bert::load_bert(&files, &device)?;
        let hidden = loaded.config.hidden_size;
        let pooler_path = match loaded.prefix { Some(p) => format!("{p}.pooler.dense"), None => "pooler.dense".to_string() };
        let pooler = candle_nn::linear(hidden, hidden, loaded.root.pp(pooler_path))?;
        let classifier = candle_nn::linear(hidden, num_labels, loaded.root.pp("classifier"))?;
        Ok(Self { model: loaded.model, pooler, classifier, tokenizer, device, model_id: settings.model.clone() })
    }

    fn logits(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        let inputs: Vec<EncodeInput> = pairs.iter().map(|&(q, t)| EncodeInput::Dual(q.into(), t.into())).collect();
        let encodings = self.tokenizer.encode_batch(inputs, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let batch = tokenize::to_batch(&encodings, &self.device)?;
        let hidden = self.model.forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        Ok(logits.i((.., 0))?.to_device(&Device::Cpu)?.to_vec1::<f32>()?)
    }
}

impl RelevanceScorer for CrossEncoder {
    fn model_id(&self) -> &str { &self.model_id }

    fn score_batch(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        if pairs.is_empty() { return Ok(vec![]); }
        self.logits(pairs).map_err(|e| Error::Model { stage: Stage::Rerank, message: format!("{e:#}") }.into())
    }
}

/// Counts distinct query words that appear in the candidate. Stand-in for the
/// cross-encoder in tests and offline runs.
#[derive(Debug, Default)]
pub struct FakeScorer;

impl FakeScorer {
    pub fn score(query: &str, text: &str) -> f32 {
        let words: HashSet<String> = normalized_terms(text).collect();
        let query_terms: HashSet<String> = normalized_terms(query).collect();
        query_terms.iter().filter(|t| words.contains(*t)).count() as f32
    }
}

impl RelevanceScorer for FakeScorer {
    fn model_id(&self) -> &str { "fake:lexical" }

    fn score_batch(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        Ok(pairs.iter().map(|&(q, t)| Self::score(q, t)).collect())
    }
}

/// The configured cross-encoder, or [`FakeScorer`] when `APP_USE_FAKE_RERANKER=1`.
pub fn get_default_scorer(settings: &RerankSettings, models: &ModelSettings) -> Result<Arc<dyn RelevanceScorer>> {
    if env_flag("APP_USE_FAKE_RERANKER") {
        tracing::info!("Using FakeScorer");
        return Ok(Arc::new(FakeScorer));
    }
    Ok(Arc::new(CrossEncoder::load(settings, models)?))
}
