//! Loading the index and chunk file as one matched pair.

use anyhow::Result;

use wikirag_core::chunk_store::load_chunks_with_hash;
use wikirag_core::config::Settings;
use wikirag_core::error::Error;
use wikirag_core::traits::{Embedder, VectorIndex};
use wikirag_core::types::Chunk;
use wikirag_vector::{IndexFingerprint, LanceVectorIndex};

/// The vector index and the chunk sequence it was built from. Immutable once
/// loaded; share it behind an `Arc`.
pub struct Artifacts {
    pub index: Box<dyn VectorIndex>,
    pub chunks: Vec<Chunk>,
}

impl Artifacts {
    pub fn new(index: Box<dyn VectorIndex>, chunks: Vec<Chunk>) -> Self { Self { index, chunks } }
}

/// Whether both artifacts exist on disk.
pub fn artifacts_present(settings: &Settings) -> bool {
    settings.data.chunks_path().is_file() && settings.data.index_path().is_dir()
}

pub fn load_artifacts(settings: &Settings, embedder: &dyn Embedder) -> Result<Artifacts> {
    let (chunks, hash) = load_chunks_with_hash(&settings.data.chunks_path())?;
    let index = LanceVectorIndex::open(&settings.data.index_path(), &settings.data.index_table)?;
    check_alignment(&index, index.fingerprint(), &chunks, &hash, embedder, settings.retrieval.strict_alignment)?;
    tracing::info!("Loaded {} chunks and an index of {} vectors", chunks.len(), index.size());
    Ok(Artifacts::new(Box::new(index), chunks))
}

/// Verify that the index, its build fingerprint, the chunk file and the query
/// embedder agree. A dimension mismatch is always fatal; the other checks are
/// downgraded to warnings when `strict` is off.
pub fn check_alignment(
    index: &dyn VectorIndex,
    fingerprint: Option<&IndexFingerprint>,
    chunks: &[Chunk],
    chunks_hash: &str,
    embedder: &dyn Embedder,
    strict: bool,
) -> Result<()> {
    if index.dim() != embedder.dim() {
        return Err(Error::ArtifactMismatch(format!("index dimension {} but embedder {} produces {}", index.dim(), embedder.model_id(), embedder.dim())).into());
    }

    let mut problems = Vec::new();
    if index.size() != chunks.len() {
        problems.push(format!("index holds {} vectors but the chunk file has {} chunks", index.size(), chunks.len()));
    }
    match fingerprint {
        Some(fp) => {
            if fp.embedder_id != embedder.model_id() {
                problems.push(format!("index built with '{}' but queries use '{}'", fp.embedder_id, embedder.model_id()));
            }
            if fp.chunks_hash != chunks_hash {
                problems.push("chunk file changed since the index was built".to_string());
            }
        }
        None => tracing::warn!("Index has no build fingerprint; skipping model and hash checks"),
    }

    if problems.is_empty() { return Ok(()); }
    let message = problems.join("; ");
    if strict {
        return Err(Error::ArtifactMismatch(message).into());
    }
    tracing::warn!("Artifact mismatch tolerated (strict_alignment = false): {}", message);
    Ok(())
}
