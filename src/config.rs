use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rag::reranking::ScoreWeights;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Generation and embedding backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:11434".to_string(),
            model: "qwen2.5:7b-instruct".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            temperature: 0.1,
            max_tokens: 2000,
            top_p: 0.9,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "default".to_string(),
        }
    }
}

/// Cross-encoder endpoint. No url means reranking is switched off.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// top_k for simple mode and the `search` command
    pub default_top_k: usize,
    /// top_k for each agent retrieval turn
    pub agent_top_k: usize,
    pub vector_weight: f32,
    pub rerank_weight: f32,
    pub use_reranker: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let weights = ScoreWeights::default();
        Self {
            default_top_k: 10,
            agent_top_k: 5,
            vector_weight: weights.vector,
            rerank_weight: weights.rerank,
            use_reranker: true,
        }
    }
}

impl RetrievalConfig {
    pub fn weights(&self) -> ScoreWeights {
        ScoreWeights {
            vector: self.vector_weight,
            rerank: self.rerank_weight,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_turns: usize,
    pub context_docs: usize,
    pub doc_char_limit: usize,
    pub context_char_threshold: usize,
    pub max_sources: usize,
    pub history_turns: usize,
    pub signal_terms: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 3,
            context_docs: 3,
            doc_char_limit: 500,
            context_char_threshold: 1000,
            max_sources: 5,
            history_turns: 3,
            signal_terms: crate::refiner::DEFAULT_SIGNAL_TERMS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// The default file is created with default values when missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            let config = Config::default();
            if path.is_none() {
                config.save_to(&config_path)?;
            }
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".ragbuddy").join("config.toml"))
    }
}
