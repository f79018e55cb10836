use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Instant;

use candle_core::Device;
use candle_transformers::models::bert::BertModel;
use tokenizers::Tokenizer;

use wikirag_core::config::{ModelSettings, RetrievalSettings};
use wikirag_core::error::{Error, Stage};
use wikirag_core::traits::Embedder;

mod bert;
pub mod cross_encoder;
pub mod device;
pub mod hub;
pub mod pool;
pub mod tokenize;

pub use cross_encoder::{get_default_scorer, CrossEncoder, FakeScorer};
pub use pool::masked_mean_l2;

/// Sentence embedder: BERT encoder, masked mean pooling, L2 normalization.
pub struct SentenceEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, model_id: String, dim: usize, max_len: usize, batch_size: usize }

impl SentenceEmbedder {
    pub fn load(settings: &RetrievalSettings, models: &ModelSettings) -> Result<Self> {
        let device = device::select_device();
        tracing::info!("Loading embedding model {}...", settings.embedding_model);
        let files = hub::resolve_model_files(&settings.embedding_model, &models.dir)?;
        let tokenizer = bert::load_tokenizer(&files, settings.max_len)?;
        let loaded = bert::load_bert(&files, &device)?;
        let dim = loaded.config.hidden_size;
        tracing::info!("Embedding model ready (dim={})", dim);
        Ok(Self {
            model: loaded.model,
            tokenizer,
            device,
            model_id: settings.embedding_model.clone(),
            dim,
            max_len: settings.max_len,
            batch_size: settings.batch_size.max(1),
        })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self.tokenizer.encode_batch(texts.to_vec(), true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let batch = tokenize::to_batch(&encodings, &self.device)?;
        let hidden = self.model.forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }
}

impl Embedder for SentenceEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let vectors = self.embed_chunk(chunk).map_err(|e| Error::Model { stage: Stage::Embedding, message: format!("{e:#}") })?;
            out.extend(vectors);
        }
        if texts.len() == 1 && start.elapsed().as_millis() > 100 { tracing::warn!("Slow embedding: {:?}", start.elapsed()); }
        Ok(out)
    }
}

/// Deterministic hashed bag-of-words vectors. Lets the whole pipeline run
/// without model weights; shared words pull vectors together.
pub struct FakeEmbedder { dim: usize, model_id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, model_id: format!("fake:xxhash:d{dim}") } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for token in normalized_terms(text) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_text(t)).collect()) }
}

/// Lowercased words with surrounding punctuation stripped.
pub(crate) fn normalized_terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
}

pub(crate) fn env_flag(name: &str) -> bool {
    std::env::var(name).ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub const FAKE_EMBEDDING_DIM: usize = 384;

/// The configured embedder, or the fake one when `APP_USE_FAKE_EMBEDDINGS=1`.
pub fn get_default_embedder(settings: &RetrievalSettings, models: &ModelSettings) -> Result<Arc<dyn Embedder>> {
    if env_flag("APP_USE_FAKE_EMBEDDINGS") {
        tracing::info!("Using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(FAKE_EMBEDDING_DIM)));
    }
    Ok(Arc::new(SentenceEmbedder::load(settings, models)?))
}
