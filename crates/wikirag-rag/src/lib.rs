//! Retrieval, reranking and answer synthesis composed into one query pipeline,
//! plus the build and load steps for the index artifacts it reads.

pub mod artifacts;
pub mod build;
pub mod dataset;
pub mod pipeline;
pub mod reranker;
pub mod retriever;

pub use artifacts::{artifacts_present, check_alignment, load_artifacts, Artifacts};
pub use build::build_artifacts;
pub use dataset::resolve_source;
pub use pipeline::{fallback_message, Pipeline, QueryOutcome, BILLING_URL, FALLBACK_ANSWER, KEY_CHECK_HINT, QUOTA_GUIDANCE};
pub use reranker::Reranker;
pub use retriever::Retriever;
