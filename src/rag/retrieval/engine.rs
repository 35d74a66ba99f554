// Retrieval scorer: wraps vector search and reranking into one ranked list
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backends::{Reranker, VectorSearch};
use crate::errors::Result;
use crate::rag::reranking::{HybridScorer, ScoreWeights};
use crate::types::RetrievedDocument;

/// Candidates fetched per requested document, to give the reranker material
pub const OVERFETCH_FACTOR: usize = 2;

/// Documents from one retrieval call, plus any absorbed failures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub documents: Vec<RetrievedDocument>,
    pub warnings: Vec<String>,
}

impl RetrievalOutcome {
    fn degraded(warning: String) -> Self {
        Self {
            documents: Vec::new(),
            warnings: vec![warning],
        }
    }
}

/// Hybrid retrieval over the vector-search and reranking collaborators
///
/// Never fails: collaborator errors come back as warnings with an empty
/// document list so the caller can carry on without context.
pub struct RetrievalScorer {
    search: Arc<dyn VectorSearch>,
    reranker: Option<Arc<dyn Reranker>>,
    scorer: HybridScorer,
}

impl RetrievalScorer {
    /// Create scorer without a reranker
    pub fn new(search: Arc<dyn VectorSearch>) -> Self {
        Self {
            search,
            reranker: None,
            scorer: HybridScorer::new(),
        }
    }

    /// Attach a reranking collaborator
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Override the combined-score weights
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.scorer.set_weights(weights);
        self
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    /// Retrieve at most `top_k` documents for `query`.
    ///
    /// With reranking active the list is ordered by descending combined
    /// score; otherwise it keeps the vector store's rank order.
    pub async fn retrieve(&self, query: &str, top_k: usize, use_reranker: bool) -> RetrievalOutcome {
        if top_k == 0 {
            return RetrievalOutcome::default();
        }

        match self.try_retrieve(query, top_k, use_reranker).await {
            Ok(documents) => {
                debug!(query, returned = documents.len(), "retrieval complete");
                RetrievalOutcome {
                    documents,
                    warnings: Vec::new(),
                }
            }
            Err(e) => {
                warn!(query, error = %e, "retrieval degraded to no documents");
                RetrievalOutcome::degraded(format!("retrieval error: {}", e))
            }
        }
    }

    async fn try_retrieve(&self, query: &str, top_k: usize, use_reranker: bool) -> Result<Vec<RetrievedDocument>> {
        let hits = self.search.search(query, top_k.saturating_mul(OVERFETCH_FACTOR)).await?;

        let mut candidates: Vec<RetrievedDocument> =
            hits.into_iter().map(RetrievedDocument::from).collect();

        match &self.reranker {
            Some(reranker) if use_reranker && !candidates.is_empty() => {
                let texts: Vec<String> = candidates.iter().map(|d| d.content.clone()).collect();
                let scores = reranker.rerank(query, &texts).await?;
                self.scorer.rank(candidates, &scores, top_k)
            }
            _ => {
                candidates.truncate(top_k);
                Ok(candidates)
            }
        }
    }
}
