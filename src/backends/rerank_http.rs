//! Cross-encoder reranking over HTTP
//!
//! Speaks the text-embeddings-inference `/rerank` shape:
//! request `{query, texts}`, response `[{index, score}]` in any order.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backends::Reranker;
use crate::errors::{RagError, Result};

/// HTTP reranking collaborator
#[derive(Debug, Clone)]
pub struct HttpReranker {
    client: Client,
    url: String,
}

impl HttpReranker {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(RagError::Http)?;

        Ok(Self {
            client,
            url: format!("{}/rerank", base_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&RerankBody {
                query,
                texts: candidates,
            })
            .send()
            .await
            .map_err(|e| RagError::Rerank(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RagError::Rerank(format!("HTTP {}", response.status())));
        }

        let ranked: Vec<RankedIndex> = response
            .json()
            .await
            .map_err(|e| RagError::Rerank(format!("malformed response: {}", e)))?;

        align_scores(ranked, candidates.len())
    }
}

/// Put scores back into candidate order; every candidate must be scored once
fn align_scores(ranked: Vec<RankedIndex>, expected: usize) -> Result<Vec<f32>> {
    let mut scores: Vec<Option<f32>> = vec![None; expected];

    for entry in ranked {
        let slot = scores
            .get_mut(entry.index)
            .ok_or_else(|| RagError::Rerank(format!("index {} out of range", entry.index)))?;
        *slot = Some(entry.score);
    }

    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| RagError::Rerank(format!("candidate {} was not scored", i))))
        .collect()
}

#[derive(Debug, Serialize)]
struct RerankBody<'a> {
    query: &'a str,
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RankedIndex {
    index: usize,
    score: f32,
}
