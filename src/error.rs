//! Error types for the fusion engine.
//!
//! Only `ClassifyError` ever reaches a caller of `FusionEngine::classify`.
//! `SignalError` is absorbed at the orchestrator boundary and turned into
//! "signal unavailable"; `IndexError` is split between the two depending on
//! whether the failure is a malformed query or a backend hiccup.

use thiserror::Error;

/// Hard failure of a classification call: the `CaptureSignals` value itself is malformed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    /// Embedding length differs from the dimension of the similarity store.
    #[error("embedding dimension mismatch: index expects {expected}, capture has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding contains NaN or infinite components.
    #[error("embedding component {index} is not finite")]
    NonFiniteEmbedding { index: usize },
}

impl ClassifyError {
    /// Short machine-readable kind, used by the HTTP layer and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::DimensionMismatch { .. } => "dimension_mismatch",
            ClassifyError::NonFiniteEmbedding { .. } => "non_finite_embedding",
        }
    }
}

/// Failure inside a single analyzer. Never surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("malformed signal input: {0}")]
    Malformed(String),

    #[error("signal backend unavailable: {0}")]
    Backend(String),
}

/// Failure of a similarity-store query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// Query dimension does not match stored vectors (hard precondition).
    #[error("query has dimension {actual}, store holds {expected}-dimensional vectors")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The store could not be read (soft; treated as "similarity unavailable").
    #[error("similarity store unavailable: {0}")]
    Unavailable(String),

    /// Rejected on write: empty or non-finite embedding.
    #[error("invalid index entry: {0}")]
    InvalidEntry(String),
}

impl From<IndexError> for SignalError {
    fn from(e: IndexError) -> Self {
        SignalError::Backend(e.to_string())
    }
}
