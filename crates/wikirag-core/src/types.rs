//! Domain types shared by the retrieval, rerank and generation stages.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Position of a chunk in the persisted chunk sequence. Doubles as the row key
/// in the vector index.
pub type ChunkId = usize;

/// An immutable unit of retrievable text.
///
/// The id is implicit: a chunk is identified by its position in the chunk
/// file, and the vector at the same position in the index embeds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chunk {
    pub text: String,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// One nearest-neighbor hit as returned by a vector index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub position: ChunkId,
}

/// A chunk with a stage-specific score and its 1-based rank in that stage.
///
/// Retrieval scores (`1 / (1 + distance)`) and rerank scores (raw logits) live
/// on different scales and must not be compared with each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f32,
    pub rank: usize,
}

/// The ordered context handed to answer synthesis. Built per query and dropped
/// once the answer is produced.
pub type QueryContext = Vec<ScoredChunk>;

/// Descending order by score for a stable sort. NaN sorts last.
pub fn by_score_desc(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    match (a.score.is_nan(), b.score.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
    }
}

/// Rewrite `rank` as the 1-based position of each item.
pub fn assign_ranks(chunks: &mut [ScoredChunk]) {
    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.rank = i + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sc(text: &str, score: f32) -> ScoredChunk {
        ScoredChunk { text: text.to_string(), score, rank: 0 }
    }

    #[test]
    fn chunk_serializes_as_plain_string() {
        let json = serde_json::to_string(&vec![Chunk::new("a b"), Chunk::new("c")]).unwrap();
        assert_eq!(json, r#"["a b","c"]"#);
    }

    #[test]
    fn nan_sorts_after_real_scores() {
        let mut v = vec![sc("nan", f32::NAN), sc("low", -3.0), sc("high", 2.0)];
        v.sort_by(by_score_desc);
        assert_eq!(v.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(), ["high", "low", "nan"]);
    }

    #[test]
    fn ranks_are_one_based() {
        let mut v = vec![sc("a", 1.0), sc("b", 0.5)];
        assign_ranks(&mut v);
        assert_eq!(v[0].rank, 1);
        assert_eq!(v[1].rank, 2);
    }
}
