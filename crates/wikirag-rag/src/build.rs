use anyhow::Result;

use wikirag_core::chunk_store::save_chunks;
use wikirag_core::config::Settings;
use wikirag_core::data_processor::{ChunkingConfig, DataProcessor};
use wikirag_core::traits::Embedder;
use wikirag_vector::{IndexFingerprint, LanceIndexWriter};

use crate::dataset::resolve_source;

/// Resolve and chunk the article source, persist the chunk file, then embed and index
/// every chunk. Both artifacts are replaced.
pub fn build_artifacts(settings: &Settings, embedder: &dyn Embedder) -> Result<IndexFingerprint> {
    let data = &settings.data;
    let processor = DataProcessor::with_config(ChunkingConfig { chunk_size: data.chunk_size, max_articles: data.max_articles });
    let source = resolve_source(data)?;
    let chunks = processor.process_with_fallback(&source, &data.fallback_max_articles)?;
    let hash = save_chunks(&data.chunks_path(), &chunks)?;
    tracing::info!("Generating embeddings for {} chunks...", chunks.len());
    let fingerprint = LanceIndexWriter::new(&data.index_path(), &data.index_table).build(&chunks, embedder, &hash)?;
    tracing::info!("Data processing complete");
    Ok(fingerprint)
}
