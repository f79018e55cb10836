//! Article source resolution: a local path when present, otherwise one file of
//! a Hugging Face Hub dataset cached under the data directory.

use anyhow::Result;
use hf_hub::api::sync::ApiBuilder;
use std::path::PathBuf;

use wikirag_core::config::DataSettings;
use wikirag_core::error::Error;

/// The path the build step should read articles from.
///
/// A missing `data.source` triggers a download of `data.dataset`, retried once
/// per entry of `fallback_max_articles`. Files already in the cache are reused
/// without touching the network.
pub fn resolve_source(data: &DataSettings) -> Result<PathBuf> {
    let source = data.source_path();
    if source.exists() { return Ok(source); }
    let dataset = &data.dataset;
    if dataset.repo.is_empty() || dataset.file.is_empty() {
        return Err(Error::NotFound(format!("article source {} (no dataset configured)", source.display())).into());
    }

    let cache = data.cache_path();
    let api = ApiBuilder::new().with_cache_dir(cache.clone()).build()?;
    let repo = api.dataset(dataset.repo.clone());
    let attempts = 1 + data.fallback_max_articles.len();
    let mut last_err = String::new();
    for attempt in 1..=attempts {
        tracing::info!("Loading dataset {}/{} into {} (attempt {}/{})", dataset.repo, dataset.file, cache.display(), attempt, attempts);
        match repo.get(&dataset.file) {
            Ok(path) => return Ok(path),
            Err(e) => {
                tracing::warn!("Error loading dataset: {}", e);
                last_err = e.to_string();
            }
        }
    }
    Err(Error::Operation(format!("downloading {}/{}: {}", dataset.repo, dataset.file, last_err)).into())
}
