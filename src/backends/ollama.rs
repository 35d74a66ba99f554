//! Ollama API client
//!
//! Generation collaborator for both consumption modes:
//! - single completion via POST /api/generate with `stream: false`
//! - streamed fragments via POST /api/generate with `stream: true`
//!
//! Also serves query embeddings via POST /api/embeddings.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backends::parser::ChunkParser;
use crate::backends::{Embedder, GenerationRequest, Generator, TextStream};
use crate::config::OllamaConfig;
use crate::errors::{RagError, Result};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Ollama HTTP client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
    options: SamplingOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct SamplingOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create client from configuration
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(RagError::Http)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            options: SamplingOptions {
                temperature: config.temperature,
                top_p: config.top_p,
                num_predict: config.max_tokens,
            },
        })
    }

    fn generate_body<'a>(&'a self, request: &'a GenerationRequest, stream: bool) -> GenerateBody<'a> {
        let mut options = self.options;
        if let Some(max_tokens) = request.max_tokens {
            options.num_predict = max_tokens;
        }
        GenerateBody {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system_prompt.as_deref(),
            stream,
            options,
        }
    }

    async fn post_generate(&self, request: &GenerationRequest, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.generate_body(request, stream))
            .send()
            .await
            .map_err(|e| RagError::GenerationFailure(format!("failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::GenerationFailure(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).timeout(Duration::from_secs(2)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "ollama health check failed");
                false
            }
        }
    }

    /// Names of locally installed models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let tags: TagsResponse = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        let response = self.post_generate(request, false).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RagError::GenerationFailure(format!("failed to parse response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(RagError::GenerationFailure(error));
        }

        Ok(body.response)
    }

    async fn stream(&self, request: &GenerationRequest) -> Result<TextStream> {
        let response = self.post_generate(request, true).await?;

        let bytes: BoxStream<'static, reqwest::Result<Vec<u8>>> = response
            .bytes_stream()
            .map(|result| result.map(|bytes| bytes.to_vec()))
            .boxed();

        let state = FragmentState {
            bytes,
            parser: ChunkParser::new(),
            pending: VecDeque::new(),
            finished: false,
        };

        Ok(futures_util::stream::unfold(state, next_fragment).boxed())
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingBody {
                model: &self.embedding_model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| RagError::RetrievalUnavailable(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RagError::RetrievalUnavailable(format!(
                "embedding HTTP {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| RagError::RetrievalUnavailable(format!("malformed embedding: {}", e)))?;

        Ok(body.embedding)
    }
}

struct FragmentState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    parser: ChunkParser,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

/// Pull the next non-empty text fragment from the byte stream
async fn next_fragment(mut state: FragmentState) -> Option<(Result<String>, FragmentState)> {
    loop {
        if let Some(item) = state.pending.pop_front() {
            return Some((item, state));
        }
        if state.finished {
            return None;
        }

        match state.bytes.next().await {
            Some(Ok(bytes)) => match state.parser.push(&bytes) {
                Ok(chunks) => {
                    for chunk in chunks {
                        if let Some(error) = chunk.error {
                            state.pending.push_back(Err(RagError::GenerationFailure(error)));
                            state.finished = true;
                            break;
                        }
                        if !chunk.response.is_empty() {
                            state.pending.push_back(Ok(chunk.response));
                        }
                        if chunk.done {
                            state.finished = true;
                            break;
                        }
                    }
                }
                Err(e) => {
                    state.pending.push_back(Err(e));
                    state.finished = true;
                }
            },
            Some(Err(e)) => {
                state
                    .pending
                    .push_back(Err(RagError::GenerationFailure(format!("stream interrupted: {}", e))));
                state.finished = true;
            }
            None => {
                state.finished = true;
                if !state.parser.is_drained() {
                    warn!(leftover = state.parser.buffer_size(), "generation stream ended mid-object");
                    state.pending.push_back(Err(RagError::GenerationFailure(
                        "stream ended with a truncated chunk".to_string(),
                    )));
                }
            }
        }
    }
}

/// Ollama generate request
#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}
