// Combined scoring: blends vector similarity with cross-encoder relevance
use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};
use crate::types::RetrievedDocument;

/// Relative weights of the two ranking signals
///
/// `combined = vector * vector_score + rerank * rerank_score`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub vector: f32,
    pub rerank: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            vector: 0.3,
            rerank: 0.7,
        }
    }
}

impl ScoreWeights {
    pub fn combine(&self, vector_score: f32, rerank_score: f32) -> f32 {
        self.vector * vector_score + self.rerank * rerank_score
    }
}

/// Applies rerank scores to a vector-ranked candidate list
#[derive(Debug, Clone, Default)]
pub struct HybridScorer {
    weights: ScoreWeights,
}

impl HybridScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Score, sort and truncate candidates.
    ///
    /// `rerank_scores` must align positionally with `candidates`. Each
    /// document's combined score depends only on its own two scores. The
    /// sort is stable, so ties keep vector-rank order.
    pub fn rank(
        &self,
        candidates: Vec<RetrievedDocument>,
        rerank_scores: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        if rerank_scores.len() != candidates.len() {
            return Err(RagError::Rerank(format!(
                "expected {} scores, got {}",
                candidates.len(),
                rerank_scores.len()
            )));
        }

        let mut ranked: Vec<RetrievedDocument> = candidates
            .into_iter()
            .zip(rerank_scores.iter().copied())
            .map(|(mut doc, rerank_score)| {
                doc.rerank_score = Some(rerank_score);
                doc.combined_score = Some(self.weights.combine(doc.vector_score, rerank_score));
                doc
            })
            .collect();

        ranked.sort_by(|a, b| b.rank_score().total_cmp(&a.rank_score()));
        ranked.truncate(top_k);

        Ok(ranked)
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    pub fn set_weights(&mut self, weights: ScoreWeights) {
        self.weights = weights;
    }
}
