// Retrieval-augmented generation building blocks
//
// Components:
// - Retrieval: vector search + optional reranking into one ranked list
// - Re-ranking: combined-score blending of the two signals
// - Context Builder: folds top fragments into prompt context
// - Prompts: system/user/deeper-query prompt construction

pub mod retrieval;
pub mod reranking;
pub mod context;
pub mod prompt;

// Re-export key types
pub use retrieval::{RetrievalOutcome, RetrievalScorer};
pub use reranking::{HybridScorer, ScoreWeights};
pub use context::{AssembledContext, ContextBuilder, ContextConfig};
