//! Locating model files: an explicit path, the local model cache, then the
//! Hugging Face Hub.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use wikirag_core::config::{expand_path, resolve_with_base};
use wikirag_core::error::Error;

#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    fn in_dir(dir: &Path) -> Option<Self> {
        let config = dir.join("config.json");
        let tokenizer = dir.join("tokenizer.json");
        let weights = ["model.safetensors", "pytorch_model.bin"].iter().map(|f| dir.join(f)).find(|p| p.exists())?;
        (config.exists() && tokenizer.exists()).then_some(Self { config, tokenizer, weights })
    }

    pub fn is_safetensors(&self) -> bool {
        self.weights.extension().and_then(|e| e.to_str()) == Some("safetensors")
    }
}

pub fn resolve_model_files(model_id: &str, models_dir: &str) -> Result<ModelFiles> {
    let explicit = expand_path(model_id);
    if let Some(files) = ModelFiles::in_dir(&explicit) {
        tracing::info!("Using model dir: {}", explicit.display());
        return Ok(files);
    }
    let cache = expand_path(models_dir);
    let basename = model_id.rsplit('/').next().unwrap_or(model_id);
    for candidate in [resolve_with_base(&cache, model_id), resolve_with_base(&cache, basename)] {
        if let Some(files) = ModelFiles::in_dir(&candidate) {
            tracing::info!("Using cached model dir: {}", candidate.display());
            return Ok(files);
        }
    }
    download(model_id)
}

fn download(model_id: &str) -> Result<ModelFiles> {
    tracing::info!("Downloading {} from the Hugging Face Hub", model_id);
    let api = hf_hub::api::sync::Api::new().context("Failed to initialize Hugging Face Hub API")?;
    let repo = api.model(model_id.to_string());
    let config = repo.get("config.json").map_err(|e| Error::NotFound(format!("{model_id}/config.json: {e}")))?;
    let tokenizer = repo.get("tokenizer.json").map_err(|e| Error::NotFound(format!("{model_id}/tokenizer.json: {e}")))?;
    let weights = match repo.get("model.safetensors") {
        Ok(path) => path,
        Err(_) => {
            tracing::warn!("model.safetensors not available for {}, using pytorch_model.bin", model_id);
            repo.get("pytorch_model.bin")
                .map_err(|e| Error::NotFound(format!("{model_id} weights: {e}")))?
        }
    };
    Ok(ModelFiles { config, tokenizer, weights })
}
