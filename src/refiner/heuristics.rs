//! Default refinement strategies: string normalization and keyword signals

use async_trait::async_trait;

use crate::errors::Result;
use crate::refiner::{QueryRewriter, RetrievalDecision, RetrievalJudge};
use crate::types::Turn;

/// Terms that mark a query as needing knowledge-base grounding
pub const DEFAULT_SIGNAL_TERMS: &[&str] = &[
    // English
    "how",
    "why",
    "what is",
    "what are",
    "steps",
    "method",
    "document",
    "knowledge",
    "explain",
    // Chinese
    "是什么",
    "怎样",
    "如何",
    "为什么",
    "步骤",
    "方法",
    "技术",
    "文档",
    "文件",
    "知识",
];

const INTERROGATIVE_MARKS: [char; 3] = ['?', '？', '¿'];

/// Strips question marks and surrounding whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationRewriter;

impl PunctuationRewriter {
    pub fn normalize(query: &str) -> String {
        query
            .chars()
            .filter(|c| !INTERROGATIVE_MARKS.contains(c))
            .collect::<String>()
            .trim()
            .to_string()
    }
}

#[async_trait]
impl QueryRewriter for PunctuationRewriter {
    async fn rewrite(&self, query: &str, _history: &[Turn]) -> Result<String> {
        Ok(Self::normalize(query))
    }
}

/// Flags a query as needing retrieval when it contains any signal term
///
/// ASCII terms match case-insensitively on word boundaries, so "how" does
/// not fire on "show". Other terms match as plain substrings.
#[derive(Debug, Clone)]
pub struct KeywordJudge {
    terms: Vec<String>,
}

impl KeywordJudge {
    pub fn new(terms: Vec<String>) -> Self {
        Self {
            terms: terms.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// First configured term present in `query`
    pub fn matched_term(&self, query: &str) -> Option<&str> {
        let lowered = query.to_lowercase();
        self.terms
            .iter()
            .find(|term| contains_term(&lowered, term))
            .map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

impl Default for KeywordJudge {
    fn default() -> Self {
        Self::new(DEFAULT_SIGNAL_TERMS.iter().map(|t| t.to_string()).collect())
    }
}

#[async_trait]
impl RetrievalJudge for KeywordJudge {
    async fn judge(&self, query: &str, _history: &[Turn]) -> Result<RetrievalDecision> {
        Ok(match self.matched_term(query) {
            Some(term) => RetrievalDecision::needed(format!(
                "query needs knowledge-base information (signal: \"{}\")",
                term
            )),
            None => RetrievalDecision::not_needed("query does not need retrieval"),
        })
    }
}

fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    if !term.is_ascii() {
        return haystack.contains(term);
    }

    haystack.match_indices(term).any(|(start, _)| {
        let end = start + term.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.map_or(false, is_word_char) && !after.map_or(false, is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
