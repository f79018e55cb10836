//! The chunk file: a pretty-printed JSON array of strings whose positions are
//! the chunk ids referenced by the vector index.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::error::Error;
use crate::types::Chunk;

pub fn save_chunks(path: &Path, chunks: &[Chunk]) -> Result<String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let bytes = serde_json::to_vec_pretty(chunks)?;
    fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!("Saved {} chunks to {}", chunks.len(), path.display());
    Ok(content_hash(&bytes))
}

pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    Ok(load_chunks_with_hash(path)?.0)
}

/// Load the chunk file together with the hash of its raw bytes.
pub fn load_chunks_with_hash(path: &Path) -> Result<(Vec<Chunk>, String)> {
    if !path.exists() {
        return Err(Error::NotFound(format!("chunk file {}", path.display())).into());
    }
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let chunks: Vec<Chunk> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing {} as a JSON array of strings", path.display()))?;
    Ok((chunks, content_hash(&bytes)))
}

pub fn content_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}
