use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use wikirag_core::error::{Error, Stage};
use wikirag_core::traits::{Embedder, VectorIndex};
use wikirag_core::types::{Chunk, ScoredChunk};

/// First stage: embed the query and map the nearest vectors back to chunk text.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    dropped: AtomicUsize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self { embedder, top_k, dropped: AtomicUsize::new(0) }
    }

    pub fn top_k(&self) -> usize { self.top_k }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    /// Hits whose position fell outside the chunk sequence, since construction.
    pub fn dropped_hits(&self) -> usize { self.dropped.load(Ordering::Relaxed) }

    /// At most `top_k` chunks, ascending by distance, scored `1 / (1 + d)`.
    pub fn retrieve(&self, query: &str, index: &dyn VectorIndex, chunks: &[Chunk]) -> Result<Vec<ScoredChunk>> {
        self.retrieve_k(query, index, chunks, self.top_k)
    }

    pub fn retrieve_k(&self, query: &str, index: &dyn VectorIndex, chunks: &[Chunk], top_k: usize) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 { return Err(Error::InvalidConfig("top_k must be at least 1".to_string()).into()); }
        if chunks.is_empty() || index.size() == 0 { return Ok(vec![]); }

        let q_vec = self.embedder.embed_batch(&[query.to_string()])?.into_iter().next().ok_or_else(|| Error::Model {
            stage: Stage::Embedding,
            message: "no vector returned for the query".to_string(),
        })?;
        let neighbors = index.search(&q_vec, top_k)?;
        let mut out = Vec::with_capacity(neighbors.len());
        for n in neighbors {
            let Some(chunk) = chunks.get(n.position) else {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Dropping hit at position {} (only {} chunks loaded)", n.position, chunks.len());
                continue;
            };
            out.push(ScoredChunk { text: chunk.text.clone(), score: distance_to_score(n.distance), rank: out.len() + 1 });
        }
        tracing::debug!("Retrieved {} chunks for query", out.len());
        Ok(out)
    }
}

/// Maps a non-negative distance into (0, 1]; smaller distance, higher score.
pub fn distance_to_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_inverse_of_distance() {
        assert_eq!(distance_to_score(0.0), 1.0);
        assert_eq!(distance_to_score(1.0), 0.5);
        assert_eq!(distance_to_score(3.0), 0.25);
        // Float noise below zero must not push the score above 1.
        assert_eq!(distance_to_score(-1e-7), 1.0);
    }
}
