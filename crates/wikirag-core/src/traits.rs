use crate::types::{Neighbor, QueryContext};

pub trait Embedder: Send + Sync {
    /// Stable identifier of the model that produced the vectors.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Read-only k-nearest-neighbor search over the vectors of one chunk set.
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn size(&self) -> usize;
    /// At most `k` neighbors, ascending by distance.
    fn search(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<Neighbor>>;
}

/// Joint (query, text) relevance model such as a cross-encoder.
pub trait RelevanceScorer: Send + Sync {
    fn model_id(&self) -> &str;
    /// One logit per pair, in input order.
    fn score_batch(&self, pairs: &[(&str, &str)]) -> anyhow::Result<Vec<f32>>;
}

pub trait AnswerSynthesizer: Send + Sync {
    /// Produce an answer from the ranked context. Behavior on an empty context
    /// is up to the implementation.
    fn generate(&self, query: &str, context: &QueryContext) -> anyhow::Result<String>;
}
