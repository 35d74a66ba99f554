// Retrieval scorer: vector search plus optional reranking
pub mod engine;

pub use engine::{RetrievalOutcome, RetrievalScorer, OVERFETCH_FACTOR};
