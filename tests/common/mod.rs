//! Deterministic collaborator stubs shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ragbuddy::agent::DEEPER_QUERY_MAX_TOKENS;
use ragbuddy::backends::{GenerationRequest, Generator, TextStream, VectorSearch};
use ragbuddy::conversation::ConversationStore;
use ragbuddy::rag::RetrievalScorer;
use ragbuddy::types::{Metadata, SearchHit};
use ragbuddy::{Orchestrator, RagError, Result};

pub const ANSWER: &str = "Chunks are split by headings and then by size.";
pub const DEEPER: &str = "chunk size and overlap settings";

/// Vector search returning a fixed hit list, or failing every call
pub struct StubSearch {
    hits: Vec<SearchHit>,
    /// Per-call hit lists; the last one repeats once exhausted
    rounds: Vec<Vec<SearchHit>>,
    down: bool,
    pub queries: Mutex<Vec<String>>,
}

impl StubSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            rounds: Vec::new(),
            down: false,
            queries: Mutex::new(Vec::new()),
        })
    }

    /// Call `i` answers with `rounds[i]`
    pub fn stepped(rounds: Vec<Vec<SearchHit>>) -> Arc<Self> {
        Arc::new(Self {
            hits: Vec::new(),
            rounds,
            down: false,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Self::with_hits(Vec::new())
    }

    /// `count` hits of `chars` characters each
    pub fn sized(count: usize, chars: usize) -> Arc<Self> {
        Self::with_hits(
            (0..count)
                .map(|i| hit(&format!("{}", i).repeat(chars), &format!("doc{}.pdf", i), 0.9))
                .collect(),
        )
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            hits: Vec::new(),
            rounds: Vec::new(),
            down: true,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorSearch for StubSearch {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let call = {
            let mut queries = self.queries.lock().unwrap();
            queries.push(query.to_string());
            queries.len() - 1
        };
        if self.down {
            return Err(RagError::RetrievalUnavailable("connection refused".to_string()));
        }
        let hits = match self.rounds.last() {
            Some(last) => self.rounds.get(call).unwrap_or(last),
            None => &self.hits,
        };
        Ok(hits.iter().take(k).cloned().collect())
    }
}

pub fn hit(content: &str, source: &str, score: f32) -> SearchHit {
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), serde_json::json!(source));
    metadata.insert("page".into(), serde_json::json!(1));
    SearchHit {
        content: content.to_string(),
        metadata,
        score,
    }
}

/// Generator answering with a fixed text; deeper-query calls get `DEEPER`
pub struct StubGenerator {
    answer: String,
    fail: bool,
    /// Delay between streamed fragments
    pace: Option<Duration>,
    pub prompts: Mutex<Vec<GenerationRequest>>,
    pub fragments_produced: Arc<AtomicUsize>,
}

impl StubGenerator {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            fail: false,
            pace: None,
            prompts: Mutex::new(Vec::new()),
            fragments_produced: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: String::new(),
            fail: true,
            pace: None,
            prompts: Mutex::new(Vec::new()),
            fragments_produced: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Streams `answer` word by word, sleeping `pace` before each word
    pub fn slow(answer: &str, pace: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            fail: false,
            pace: Some(pace),
            prompts: Mutex::new(Vec::new()),
            fragments_produced: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn produced(&self) -> usize {
        self.fragments_produced.load(Ordering::SeqCst)
    }

    fn is_deeper_query(request: &GenerationRequest) -> bool {
        request.max_tokens == Some(DEEPER_QUERY_MAX_TOKENS)
    }

    fn record(&self, request: &GenerationRequest) -> Result<()> {
        self.prompts.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(RagError::GenerationFailure("model crashed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        self.record(request)?;
        if Self::is_deeper_query(request) {
            return Ok(DEEPER.to_string());
        }
        Ok(self.answer.clone())
    }

    async fn stream(&self, request: &GenerationRequest) -> Result<TextStream> {
        self.record(request)?;

        let words: Vec<String> = self
            .answer
            .split_inclusive(' ')
            .map(|w| w.to_string())
            .collect();
        let pace = self.pace;
        let produced = Arc::clone(&self.fragments_produced);

        Ok(stream::iter(words)
            .then(move |word| {
                let produced = Arc::clone(&produced);
                async move {
                    if let Some(pace) = pace {
                        tokio::time::sleep(pace).await;
                    }
                    produced.fetch_add(1, Ordering::SeqCst);
                    Ok::<String, RagError>(word)
                }
            })
            .boxed())
    }
}

pub fn orchestrator(search: Arc<StubSearch>, generator: Arc<StubGenerator>) -> Orchestrator {
    Orchestrator::new(
        RetrievalScorer::new(search),
        generator,
        Arc::new(ConversationStore::new()),
    )
}
