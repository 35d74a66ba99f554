// Context assembly: folds the top retrieved fragments into prompt context
use serde::{Deserialize, Serialize};

use crate::types::RetrievedDocument;

/// Label used when a document carries no `source` metadata
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Documents folded in per build
    pub max_documents: usize,
    /// Per-document character cap
    pub doc_char_limit: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_documents: 3,
            doc_char_limit: 500,
        }
    }
}

/// Assembled context for prompt augmentation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub text: String,
    pub fragment_count: usize,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters (not bytes)
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Builds `[doc i - source]: content` blocks separated by blank lines
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build context from the leading documents of one retrieval result
    pub fn build(&self, documents: &[RetrievedDocument]) -> AssembledContext {
        let blocks: Vec<String> = documents
            .iter()
            .take(self.config.max_documents)
            .enumerate()
            .map(|(idx, doc)| {
                format!(
                    "[doc {} - {}]: {}",
                    idx + 1,
                    doc.source().unwrap_or(UNKNOWN_SOURCE),
                    truncate_chars(&doc.content, self.config.doc_char_limit)
                )
            })
            .collect();

        AssembledContext {
            fragment_count: blocks.len(),
            text: blocks.join("\n\n"),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

/// First `limit` characters of `text`, never splitting a code point
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
