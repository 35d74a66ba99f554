//! Agent thought trail entries

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Identifier of the orchestrator step that produced a thought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThoughtStep {
    Start,
    QueryRewrite,
    RetrievalJudgment,
    RetrievalTurn(usize),
    RetrievalWarning,
    ContextBuilding,
    QueryDeepening,
    SimpleRetrieval,
    Generation,
    Complete,
    Error,
}

impl fmt::Display for ThoughtStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThoughtStep::Start => write!(f, "start"),
            ThoughtStep::QueryRewrite => write!(f, "query_rewrite"),
            ThoughtStep::RetrievalJudgment => write!(f, "retrieval_judgment"),
            ThoughtStep::RetrievalTurn(turn) => write!(f, "retrieval_turn_{}", turn),
            ThoughtStep::RetrievalWarning => write!(f, "retrieval_warning"),
            ThoughtStep::ContextBuilding => write!(f, "context_building"),
            ThoughtStep::QueryDeepening => write!(f, "query_deepening"),
            ThoughtStep::SimpleRetrieval => write!(f, "simple_retrieval"),
            ThoughtStep::Generation => write!(f, "generation"),
            ThoughtStep::Complete => write!(f, "complete"),
            ThoughtStep::Error => write!(f, "error"),
        }
    }
}

impl Serialize for ThoughtStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ThoughtStep {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let step = match raw.as_str() {
            "start" => ThoughtStep::Start,
            "query_rewrite" => ThoughtStep::QueryRewrite,
            "retrieval_judgment" => ThoughtStep::RetrievalJudgment,
            "retrieval_warning" => ThoughtStep::RetrievalWarning,
            "context_building" => ThoughtStep::ContextBuilding,
            "query_deepening" => ThoughtStep::QueryDeepening,
            "simple_retrieval" => ThoughtStep::SimpleRetrieval,
            "generation" => ThoughtStep::Generation,
            "complete" => ThoughtStep::Complete,
            "error" => ThoughtStep::Error,
            other => {
                let turn = other
                    .strip_prefix("retrieval_turn_")
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| serde::de::Error::custom(format!("unknown thought step: {}", other)))?;
                ThoughtStep::RetrievalTurn(turn)
            }
        };
        Ok(step)
    }
}

/// One recorded step of the orchestrator's reasoning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentThought {
    pub step: ThoughtStep,
    pub narrative: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl AgentThought {
    pub fn new(step: ThoughtStep, narrative: impl Into<String>) -> Self {
        Self {
            step,
            narrative: narrative.into(),
            action: None,
            result: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }
}
