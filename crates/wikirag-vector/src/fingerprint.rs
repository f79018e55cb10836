use std::collections::HashMap;

/// How an index artifact was built. Stored in the meta table next to the
/// index so a reader can tell whether a chunk file and embedder belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFingerprint {
    pub embedder_id: String,
    pub dim: usize,
    pub chunk_count: usize,
    /// blake3 of the chunk file bytes.
    pub chunks_hash: String,
    pub built_at: String,
}

impl IndexFingerprint {
    pub fn new(embedder_id: &str, dim: usize, chunk_count: usize, chunks_hash: &str) -> Self {
        Self {
            embedder_id: embedder_id.to_string(),
            dim,
            chunk_count,
            chunks_hash: chunks_hash.to_string(),
            built_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub(crate) fn to_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("embedder_id", self.embedder_id.clone()),
            ("dim", self.dim.to_string()),
            ("chunk_count", self.chunk_count.to_string()),
            ("chunks_hash", self.chunks_hash.clone()),
            ("built_at", self.built_at.clone()),
        ]
    }

    /// `None` when the meta table is missing or incomplete.
    pub(crate) fn from_entries(meta: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            embedder_id: meta.get("embedder_id")?.clone(),
            dim: meta.get("dim")?.parse().ok()?,
            chunk_count: meta.get("chunk_count")?.parse().ok()?,
            chunks_hash: meta.get("chunks_hash")?.clone(),
            built_at: meta.get("built_at").cloned().unwrap_or_default(),
        })
    }
}
