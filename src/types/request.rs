//! Request and aggregate response types exposed to callers

use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};
use crate::types::{AgentThought, RetrievedDocument, Turn};

/// One question submitted to the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub history: Vec<Turn>,
    #[serde(default = "default_use_agent")]
    pub use_agent: bool,
}

fn default_use_agent() -> bool {
    true
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            conversation_id: None,
            history: Vec::new(),
            use_agent: true,
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn simple(mut self) -> Self {
        self.use_agent = false;
        self
    }

    /// Reject malformed requests before any orchestration work
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(RagError::Validation("query must not be empty".to_string()));
        }
        if let Some(id) = &self.conversation_id {
            if id.trim().is_empty() {
                return Err(RagError::Validation(
                    "conversation id must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Aggregate result of a successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub conversation_id: String,
    pub sources: Vec<RetrievedDocument>,
    pub thought_trail: Vec<AgentThought>,
    /// Seconds from run start to completion
    pub elapsed_time: f64,
}

/// Aggregate result of a run that ended in the error state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatFailure {
    pub error: String,
    pub conversation_id: String,
    pub thought_trail: Vec<AgentThought>,
}
