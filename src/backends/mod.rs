//! Collaborator interfaces
//!
//! The orchestration core only talks to the outside world through these
//! narrow capabilities, so test doubles can stand in for any of them.
//! Timeouts belong to the implementations, never to the orchestrator.

pub mod ollama;
pub mod parser;
pub mod qdrant;
pub mod rerank_http;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::errors::Result;
use crate::types::SearchHit;

// Re-export concrete backends
pub use ollama::{OllamaClient, DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
pub use parser::{ChunkParser, GenerateChunk, MAX_BUFFER_SIZE};
pub use qdrant::{CollectionSummary, QdrantSearch};
pub use rerank_http::HttpReranker;

/// Lazily produced text fragments from a streamed generation
pub type TextStream = BoxStream<'static, Result<String>>;

/// Similarity search over the document corpus
///
/// Hits come back in the collaborator's rank order. The meaning of
/// `score` (higher- or lower-is-better) is defined by the implementation
/// and passed through unchanged.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Fails with `RagError::RetrievalUnavailable` when the store is unreachable
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
}

/// Cross-encoder style relevance scoring
#[async_trait]
pub trait Reranker: Send + Sync {
    /// One score per candidate, aligned positionally with `candidates`
    async fn rerank(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>>;
}

/// Text embedding used to build query vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Prompt for the generation backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Overrides the backend's configured output cap
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Language-model generation
///
/// Failures surface as `RagError::GenerationFailure`.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Single-completion mode
    async fn complete(&self, request: &GenerationRequest) -> Result<String>;

    /// Streamed-chunk mode
    async fn stream(&self, request: &GenerationRequest) -> Result<TextStream>;
}
