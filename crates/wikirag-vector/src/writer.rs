use anyhow::{ensure, Result};
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wikirag_core::traits::Embedder;
use wikirag_core::types::Chunk;

use crate::fingerprint::IndexFingerprint;
use crate::schema::build_index_schema;
use crate::table;

/// Builds a fresh index artifact. Any previous index directory is replaced,
/// so a table never mixes vectors from two builds.
pub struct LanceIndexWriter { db_path: PathBuf, table_name: String, batch_size: usize }

impl LanceIndexWriter {
	pub fn new(db_path: &Path, table_name: &str) -> Self {
		Self { db_path: db_path.to_path_buf(), table_name: table_name.to_string(), batch_size: 1000 }
	}

	pub fn with_batch_size(mut self, batch_size: usize) -> Self { self.batch_size = batch_size.max(1); self }

	/// Embed `chunks` in order and write one row per chunk, keyed by position.
	pub fn build(&self, chunks: &[Chunk], embedder: &dyn Embedder, chunks_hash: &str) -> Result<IndexFingerprint> {
		let rt = tokio::runtime::Runtime::new()?;
		rt.block_on(self.build_async(chunks, embedder, chunks_hash))
	}

	async fn build_async(&self, chunks: &[Chunk], embedder: &dyn Embedder, chunks_hash: &str) -> Result<IndexFingerprint> {
		if self.db_path.exists() { std::fs::remove_dir_all(&self.db_path)?; }
		std::fs::create_dir_all(&self.db_path)?;
		let db = table::open_db(&self.db_path.to_string_lossy()).await?;
		let dim = embedder.dim();
		tracing::info!("Indexing {} chunks into LanceDB table: {}", chunks.len(), self.table_name);
		let pb = ProgressBar::new(chunks.len() as u64);
		if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}") {
			pb.set_style(style.progress_chars("#>-"));
		}
		let mut batches = Vec::new();
		for (batch_no, window) in chunks.chunks(self.batch_size).enumerate() {
			let texts: Vec<String> = window.iter().map(|c| c.text.clone()).collect();
			let vectors = embedder.embed_batch(&texts)?;
			ensure!(vectors.len() == window.len(), "embedder returned {} vectors for {} chunks", vectors.len(), window.len());
			let offset = batch_no * self.batch_size;
			batches.push(to_record_batch(offset, &vectors, dim)?);
			pb.inc(window.len() as u64);
			pb.set_message(format!("batch {}", batch_no + 1));
		}
		table::create_table(&db, &self.table_name, build_index_schema(dim), batches).await?;
		pb.finish_with_message("LanceDB indexing completed");

		let fingerprint = IndexFingerprint::new(embedder.model_id(), dim, chunks.len(), chunks_hash);
		table::write_meta(&db, &fingerprint.to_entries()).await?;
		tracing::info!("Successfully indexed {} chunks (dim={}, embedder={})", chunks.len(), dim, fingerprint.embedder_id);
		Ok(fingerprint)
	}
}

fn to_record_batch(offset: usize, vectors: &[Vec<f32>], dim: usize) -> Result<RecordBatch> {
	let mut positions = Vec::with_capacity(vectors.len());
	for (i, v) in vectors.iter().enumerate() {
		ensure!(v.len() == dim, "vector {} has dimension {}, expected {}", offset + i, v.len(), dim);
		positions.push(i32::try_from(offset + i)?);
	}
	let values = vectors.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));
	Ok(RecordBatch::try_new(build_index_schema(dim), vec![
		Arc::new(Int32Array::from(positions)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(values, dim as i32)),
	])?)
}
