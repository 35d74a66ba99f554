//! Property-based tests for the retrieval scorer
//!
//! Properties:
//! - never more than top_k documents
//! - descending combined score when reranking is active
//! - equal combined scores keep vector-rank order
//! - vector order preserved when reranking is off

mod common;

use async_trait::async_trait;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use std::sync::Arc;

use common::hit;
use ragbuddy::backends::Reranker;
use ragbuddy::rag::RetrievalScorer;
use ragbuddy::Result;

/// Returns a fixed score list, cycling when there are more candidates
struct FixedReranker {
    scores: Vec<f32>,
}

#[async_trait]
impl Reranker for FixedReranker {
    async fn rerank(&self, _query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        Ok((0..candidates.len())
            .map(|i| self.scores[i % self.scores.len()])
            .collect())
    }
}

/// Map arbitrary bytes to small, finite scores with frequent ties
fn scores_from(raw: &[u8]) -> Vec<f32> {
    raw.iter().map(|b| f32::from(b % 8) / 8.0).collect()
}

fn search_with(vector_scores: &[f32]) -> Arc<common::StubSearch> {
    common::StubSearch::with_hits(
        vector_scores
            .iter()
            .enumerate()
            .map(|(i, &score)| hit(&format!("doc{}", i), "s", score))
            .collect(),
    )
}

#[quickcheck]
fn prop_never_exceeds_top_k(raw: Vec<u8>, top_k: u8) -> TestResult {
    let top_k = (top_k % 20) as usize;
    if top_k == 0 {
        return TestResult::discard();
    }
    let scorer = RetrievalScorer::new(search_with(&scores_from(&raw)));

    let outcome = tokio_test::block_on(scorer.retrieve("q", top_k, false));
    TestResult::from_bool(outcome.documents.len() <= top_k && outcome.documents.len() <= raw.len())
}

#[quickcheck]
fn prop_reranked_order_is_descending_and_stable(raw_vector: Vec<u8>, raw_rerank: Vec<u8>, top_k: u8) -> TestResult {
    let top_k = (top_k % 20) as usize + 1;
    if raw_rerank.is_empty() {
        return TestResult::discard();
    }
    let scorer = RetrievalScorer::new(search_with(&scores_from(&raw_vector))).with_reranker(Arc::new(
        FixedReranker {
            scores: scores_from(&raw_rerank),
        },
    ));

    let outcome = tokio_test::block_on(scorer.retrieve("q", top_k, true));
    let docs = &outcome.documents;

    if docs.len() > top_k || !outcome.warnings.is_empty() {
        return TestResult::failed();
    }

    let index = |content: &str| -> usize {
        content.trim_start_matches("doc").parse().unwrap_or(usize::MAX)
    };

    let ordered = docs.windows(2).all(|w| {
        let (a, b) = (w[0].combined_score.unwrap(), w[1].combined_score.unwrap());
        a > b || (a == b && index(&w[0].content) < index(&w[1].content))
    });
    TestResult::from_bool(ordered)
}

#[quickcheck]
fn prop_combined_score_uses_only_own_scores(raw_vector: Vec<u8>, raw_rerank: Vec<u8>) -> TestResult {
    if raw_rerank.is_empty() {
        return TestResult::discard();
    }
    let scorer = RetrievalScorer::new(search_with(&scores_from(&raw_vector))).with_reranker(Arc::new(
        FixedReranker {
            scores: scores_from(&raw_rerank),
        },
    ));

    let outcome = tokio_test::block_on(scorer.retrieve("q", 10, true));
    TestResult::from_bool(outcome.documents.iter().all(|d| {
        let expected = 0.3 * d.vector_score + 0.7 * d.rerank_score.unwrap();
        (d.combined_score.unwrap() - expected).abs() < 1e-6
    }))
}

#[quickcheck]
fn prop_without_reranking_vector_order_is_kept(raw: Vec<u8>, top_k: u8) -> bool {
    let top_k = (top_k % 20) as usize + 1;
    let scorer = RetrievalScorer::new(search_with(&scores_from(&raw)));

    let outcome = tokio_test::block_on(scorer.retrieve("q", top_k, true));
    let expected: Vec<String> = (0..raw.len().min(top_k)).map(|i| format!("doc{}", i)).collect();
    let actual: Vec<String> = outcome.documents.iter().map(|d| d.content.clone()).collect();

    actual == expected && outcome.documents.iter().all(|d| d.combined_score.is_none())
}
