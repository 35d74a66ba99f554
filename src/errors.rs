//! Error types for RagBuddy
//!
//! One taxonomy for the whole pipeline. Retrieval-side failures are
//! recoverable and get folded into the thought trail; generation failures
//! and internal faults end the run.

use thiserror::Error;

use crate::types::ChatFailure;

/// Main error type for the retrieval/generation pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// Malformed request, rejected before orchestration starts
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Conversation lookup miss
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// Vector store unreachable or search failed
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Reranking collaborator failed
    #[error("Reranking failed: {0}")]
    Rerank(String),

    /// Generation backend failed (fatal to the run)
    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    /// Orchestration run ended in the error state; carries the partial trail
    #[error("Run failed: {}", .0.error)]
    RunFailed(Box<ChatFailure>),

    /// Stream consumer went away before the run finished
    #[error("Run cancelled: event consumer disconnected")]
    Cancelled,

    /// Invalid state machine transition
    #[error("Invalid state transition from {from} via {event}")]
    InvalidTransition { from: String, event: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Generic(err.to_string())
    }
}
