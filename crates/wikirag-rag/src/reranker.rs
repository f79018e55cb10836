use anyhow::Result;
use std::sync::Arc;

use wikirag_core::error::{Error, Stage};
use wikirag_core::traits::RelevanceScorer;
use wikirag_core::types::{assign_ranks, by_score_desc, ScoredChunk};

/// Second stage: rescore every candidate jointly with the query and reorder.
pub struct Reranker {
    scorer: Arc<dyn RelevanceScorer>,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>) -> Self { Self { scorer } }

    pub fn model_id(&self) -> &str { self.scorer.model_id() }

    /// Same candidates, scored by the relevance model, highest first. Ties keep
    /// their input order.
    pub fn rerank(&self, query: &str, candidates: Vec<ScoredChunk>) -> Result<Vec<ScoredChunk>> {
        if candidates.is_empty() { return Ok(candidates); }
        let pairs: Vec<(&str, &str)> = candidates.iter().map(|c| (query, c.text.as_str())).collect();
        let scores = self.scorer.score_batch(&pairs)?;
        if scores.len() != candidates.len() {
            return Err(Error::Model {
                stage: Stage::Rerank,
                message: format!("expected {} scores, got {}", candidates.len(), scores.len()),
            }
            .into());
        }
        let mut ranked: Vec<ScoredChunk> = candidates.into_iter().zip(scores).map(|(c, score)| ScoredChunk { score, ..c }).collect();
        ranked.sort_by(by_score_desc);
        assign_ranks(&mut ranked);
        Ok(ranked)
    }
}
