//! Retrieved document types

use serde::{Deserialize, Serialize};

/// Document metadata as stored alongside a vector
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Raw hit returned by the vector-search collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub metadata: Metadata,
    /// Collaborator-defined score, passed through unchanged
    pub score: f32,
}

/// Document produced by one retrieval call
///
/// `combined_score`, when present, is derived only from this document's own
/// `vector_score` and `rerank_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub metadata: Metadata,
    pub vector_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined_score: Option<f32>,
}

impl From<SearchHit> for RetrievedDocument {
    fn from(hit: SearchHit) -> Self {
        Self {
            content: hit.content,
            metadata: hit.metadata,
            vector_score: hit.score,
            rerank_score: None,
            combined_score: None,
        }
    }
}

impl RetrievedDocument {
    /// `source` metadata field, if it is a string
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }

    /// `page` metadata field rendered as text
    pub fn page(&self) -> Option<String> {
        self.metadata.get("page").map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Score used for ranking: combined when reranked, vector otherwise
    pub fn rank_score(&self) -> f32 {
        self.combined_score.unwrap_or(self.vector_score)
    }
}
