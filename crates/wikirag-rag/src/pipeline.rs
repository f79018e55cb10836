//! Query pipeline: retrieve, rerank, synthesize, strictly in that order.

use anyhow::Result;
use std::sync::Arc;

use wikirag_core::config::Settings;
use wikirag_core::error::{Error, UpstreamKind};
use wikirag_core::traits::AnswerSynthesizer;
use wikirag_core::types::QueryContext;
use wikirag_embed::{get_default_embedder, get_default_scorer};
use wikirag_llm::OpenAiSynthesizer;

use crate::artifacts::{load_artifacts, Artifacts};
use crate::reranker::Reranker;
use crate::retriever::Retriever;

pub const FALLBACK_ANSWER: &str = "Sorry, I encountered an error while processing your query.";

macro_rules! billing_url { () => { "https://platform.openai.com/account/billing" } }

pub const BILLING_URL: &str = billing_url!();

pub const QUOTA_GUIDANCE: &str = concat!(
    "Your OpenAI API key has insufficient quota. Please:\n",
    "1. Check your billing status at ", billing_url!(), "\n",
    "2. Add payment method if needed\n",
    "3. Try a different API key",
);

/// Printed when the key check against the provider fails.
pub const KEY_CHECK_HINT: &str = concat!("Please check your API key and billing status at ", billing_url!());

/// Result of one successful pipeline run.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// The reranked context the answer was generated from.
    pub context: QueryContext,
    pub answer: String,
}

pub struct Pipeline {
    retriever: Retriever,
    reranker: Reranker,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    artifacts: Arc<Artifacts>,
}

impl Pipeline {
    pub fn new(retriever: Retriever, reranker: Reranker, synthesizer: Arc<dyn AnswerSynthesizer>, artifacts: Arc<Artifacts>) -> Self {
        Self { retriever, reranker, synthesizer, artifacts }
    }

    /// Load models and artifacts once for the life of the process.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = get_default_embedder(&settings.retrieval, &settings.models)?;
        let artifacts = load_artifacts(settings, embedder.as_ref())?;
        let scorer = get_default_scorer(&settings.rerank, &settings.models)?;
        let synthesizer = OpenAiSynthesizer::new(&settings.generation)?;
        Ok(Self::new(
            Retriever::new(embedder, settings.retrieval.top_k),
            Reranker::new(scorer),
            Arc::new(synthesizer),
            Arc::new(artifacts),
        ))
    }

    pub fn retriever(&self) -> &Retriever { &self.retriever }

    pub fn artifacts(&self) -> &Arc<Artifacts> { &self.artifacts }

    /// Retrieval and optional reranking without calling the synthesizer.
    pub fn search(&self, query: &str, top_k: usize, rerank: bool) -> Result<QueryContext> {
        let candidates = self.retriever.retrieve_k(query, self.artifacts.index.as_ref(), &self.artifacts.chunks, top_k)?;
        if !rerank { return Ok(candidates); }
        self.reranker.rerank(query, candidates)
    }

    pub fn run(&self, query: &str) -> Result<QueryOutcome> {
        let candidates = self.retriever.retrieve(query, self.artifacts.index.as_ref(), &self.artifacts.chunks)?;
        let context = self.reranker.rerank(query, candidates)?;
        let answer = self.synthesizer.generate(query, &context)?;
        Ok(QueryOutcome { context, answer })
    }

    /// Never fails: any error is logged and replaced by [`FALLBACK_ANSWER`],
    /// followed by billing guidance when the synthesizer ran out of quota.
    pub fn answer_query(&self, query: &str) -> String {
        match self.run(query) {
            Ok(outcome) => outcome.answer,
            Err(e) => {
                tracing::error!("Error processing query: {:#}", e);
                fallback_message(&e)
            }
        }
    }
}

pub fn is_quota_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.downcast_ref::<Error>().and_then(Error::upstream_kind) == Some(UpstreamKind::Quota))
}

pub fn fallback_message(err: &anyhow::Error) -> String {
    if is_quota_error(err) {
        format!("{FALLBACK_ANSWER}\n\n{QUOTA_GUIDANCE}")
    } else {
        FALLBACK_ANSWER.to_string()
    }
}
