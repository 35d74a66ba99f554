//! Generation-backed query rewriting

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::backends::{GenerationRequest, Generator};
use crate::errors::Result;
use crate::refiner::heuristics::PunctuationRewriter;
use crate::refiner::QueryRewriter;
use crate::types::Turn;

const REWRITE_MAX_TOKENS: u32 = 100;
const REWRITE_HISTORY_TURNS: usize = 3;

/// Asks the language model to rewrite the query for vector search.
///
/// Falls back to punctuation normalization when the model returns nothing.
pub struct GenerativeRewriter {
    generator: Arc<dyn Generator>,
}

impl GenerativeRewriter {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    fn prompt(query: &str, history: &[Turn]) -> String {
        let start = history.len().saturating_sub(REWRITE_HISTORY_TURNS);
        let recent: Vec<String> = history[start..]
            .iter()
            .map(|t| format!("{}: {}", t.role, t.content))
            .collect();
        let recent = if recent.is_empty() {
            "none".to_string()
        } else {
            recent.join("\n")
        };

        format!(
            "Rewrite the user query into a form suited to document retrieval. Keep the \
             meaning, extract the key entities and concepts, and resolve ambiguity using \
             the conversation history.\n\nHistory:\n{}\n\nQuery: {}\n\nRewritten query:",
            recent, query
        )
    }
}

#[async_trait]
impl QueryRewriter for GenerativeRewriter {
    async fn rewrite(&self, query: &str, history: &[Turn]) -> Result<String> {
        let request = GenerationRequest::new(Self::prompt(query, history))
            .with_max_tokens(REWRITE_MAX_TOKENS);
        let rewritten = self.generator.complete(&request).await?;
        let rewritten = rewritten.trim();

        if rewritten.is_empty() {
            debug!("empty rewrite from model, using normalized query");
            return Ok(PunctuationRewriter::normalize(query));
        }
        Ok(rewritten.to_string())
    }
}
