//! Doctor command for collaborator diagnostics
//!
//! Checks that the generation backend, the configured models, the vector
//! store and the optional reranker are reachable, and reports the size and
//! status of the configured collection.

use colored::Colorize;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::{CollectionSummary, Embedder, OllamaClient, QdrantSearch};
use crate::config::Config;
use crate::errors::Result;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Extra information shown next to a passing check
    pub detail: Option<String>,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
    ollama: Arc<OllamaClient>,
}

impl Doctor {
    pub fn new(config: Config) -> Result<Self> {
        let ollama = Arc::new(OllamaClient::new(&config.ollama)?);
        Ok(Self { config, ollama })
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = Vec::new();

        checks.push(self.check_ollama_api().await);
        checks.extend(self.check_models().await);
        checks.extend(self.check_qdrant().await);
        checks.push(self.check_reranker().await);

        checks
    }

    async fn check_ollama_api(&self) -> HealthCheck {
        let status = if self.ollama.health_check().await {
            HealthStatus::Pass
        } else {
            HealthStatus::Fail(format!("not reachable at {}", self.ollama.base_url()))
        };
        HealthCheck::new("Ollama API", status)
    }

    async fn check_models(&self) -> Vec<HealthCheck> {
        let installed = match self.ollama.list_models().await {
            Ok(models) => models,
            Err(e) => {
                return vec![HealthCheck::new(
                    "Models",
                    HealthStatus::Fail(format!("cannot list models: {}", e)),
                )]
            }
        };

        [
            ("Generation Model", &self.config.ollama.model),
            ("Embedding Model", &self.config.ollama.embedding_model),
        ]
        .into_iter()
        .map(|(name, model)| {
            let status = if model_installed(&installed, model) {
                HealthStatus::Pass
            } else {
                HealthStatus::Fail(format!("{} not installed (ollama pull {})", model, model))
            };
            HealthCheck::new(name, status)
        })
        .collect()
    }

    /// Server reachability, then the configured collection
    async fn check_qdrant(&self) -> Vec<HealthCheck> {
        let embedder: Arc<dyn Embedder> = self.ollama.clone();
        let search = match QdrantSearch::new(&self.config.qdrant, embedder) {
            Ok(search) => search,
            Err(e) => return vec![HealthCheck::new("Qdrant", HealthStatus::Fail(e.to_string()))],
        };

        match search.health_check().await {
            Ok(version) => {
                let server = HealthCheck::new("Qdrant", HealthStatus::Pass).with_detail(format!("v{}", version));
                let collection = match search.collection_info(search.collection()).await {
                    Ok(summary) => collection_check(&summary),
                    Err(e) => HealthCheck::new("Collection", HealthStatus::Fail(e.to_string())),
                };
                vec![server, collection]
            }
            Err(e) => vec![HealthCheck::new("Qdrant", HealthStatus::Fail(e.to_string()))],
        }
    }

    async fn check_reranker(&self) -> HealthCheck {
        let Some(url) = &self.config.reranker.url else {
            return HealthCheck::new(
                "Reranker",
                HealthStatus::Warn("not configured, vector order only".to_string()),
            );
        };

        let health_url = format!("{}/health", url.trim_end_matches('/'));
        let status = match Client::new()
            .get(&health_url)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => HealthStatus::Pass,
            Ok(response) => HealthStatus::Warn(format!("HTTP {}", response.status())),
            Err(e) => HealthStatus::Fail(format!("not reachable: {}", e)),
        };
        HealthCheck::new("Reranker", status)
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\n{}\n", "RagBuddy Diagnostics".bold());
        println!("{:<20} Status", "Check");
        println!("{}", "=".repeat(50));

        for check in checks {
            let line = match &check.status {
                HealthStatus::Pass => match &check.detail {
                    Some(detail) => format!("PASS ({})", detail).green(),
                    None => "PASS".green(),
                },
                HealthStatus::Warn(msg) => format!("WARN: {}", msg).yellow(),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg).red(),
            };
            println!("{:<20} {}", check.name, line);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

/// Red collections fail; empty or degraded ones only warn
fn collection_check(summary: &CollectionSummary) -> HealthCheck {
    let detail = format!(
        "{}: {} points, {}",
        summary.name, summary.points_count, summary.status
    );
    let status = match summary.status.as_str() {
        "red" => HealthStatus::Fail(detail.clone()),
        "green" if !summary.is_empty() => HealthStatus::Pass,
        _ if summary.is_empty() => HealthStatus::Warn(format!("{} (nothing ingested yet)", detail)),
        _ => HealthStatus::Warn(detail.clone()),
    };
    HealthCheck::new("Collection", status).with_detail(detail)
}

/// Ollama reports `name:tag`; an untagged model means `:latest`
fn model_installed(installed: &[String], model: &str) -> bool {
    installed.iter().any(|name| {
        name == model || (!model.contains(':') && name == &format!("{}:latest", model))
    })
}
