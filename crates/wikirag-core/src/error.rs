use std::fmt;
use thiserror::Error;

/// Inference stage that produced a model error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Rerank,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Embedding => f.write_str("embedding"),
            Stage::Rerank => f.write_str("rerank"),
        }
    }
}

/// How a remote service failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// Billing or quota exhausted; retrying will not help.
    Quota,
    /// Missing, invalid or revoked credentials.
    Auth,
    /// Rate limiting, 5xx or connection trouble.
    Transient,
    Other,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),

    #[error("{stage} model failed: {message}")]
    Model { stage: Stage, message: String },

    #[error("Upstream {kind:?} error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upstream { kind: UpstreamKind, status: Option<u16>, message: String },

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn upstream_kind(&self) -> Option<UpstreamKind> {
        match self {
            Error::Upstream { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
