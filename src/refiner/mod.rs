//! Query refinement
//!
//! Two independently substitutable strategies run before retrieval:
//! rewriting the raw query for search, and deciding whether the query needs
//! factual grounding at all. Defaults are cheap heuristics; a
//! generation-backed rewriter is available as a drop-in.

pub mod heuristics;
pub mod generative;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::Turn;

pub use heuristics::{KeywordJudge, PunctuationRewriter, DEFAULT_SIGNAL_TERMS};
pub use generative::GenerativeRewriter;

/// Outcome of the retrieval-necessity judgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalDecision {
    pub needed: bool,
    pub reason: String,
}

impl RetrievalDecision {
    pub fn needed(reason: impl Into<String>) -> Self {
        Self {
            needed: true,
            reason: reason.into(),
        }
    }

    pub fn not_needed(reason: impl Into<String>) -> Self {
        Self {
            needed: false,
            reason: reason.into(),
        }
    }
}

/// Rewrites a raw query into a retrieval-friendly form
#[async_trait]
pub trait QueryRewriter: Send + Sync {
    async fn rewrite(&self, query: &str, history: &[Turn]) -> Result<String>;
}

/// Decides whether a query requires retrieval
#[async_trait]
pub trait RetrievalJudge: Send + Sync {
    async fn judge(&self, query: &str, history: &[Turn]) -> Result<RetrievalDecision>;
}
