// Hybrid score blending for reranked retrieval
pub mod scorer;

pub use scorer::{HybridScorer, ScoreWeights};
