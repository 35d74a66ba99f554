//! Per-run thought log
//!
//! Append-only record of what the orchestrator did, in execution order.
//! One log per run; never shared across runs.

use crate::types::{AgentThought, ThoughtStep};

#[derive(Debug, Clone, Default)]
pub struct ThoughtLog {
    thoughts: Vec<AgentThought>,
}

impl ThoughtLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a thought and return a reference to the stored entry
    pub fn record(&mut self, thought: AgentThought) -> &AgentThought {
        self.thoughts.push(thought);
        &self.thoughts[self.thoughts.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.thoughts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thoughts.is_empty()
    }

    /// Step identifiers in execution order
    pub fn steps(&self) -> Vec<ThoughtStep> {
        self.thoughts.iter().map(|t| t.step).collect()
    }

    pub fn as_slice(&self) -> &[AgentThought] {
        &self.thoughts
    }

    pub fn to_vec(&self) -> Vec<AgentThought> {
        self.thoughts.clone()
    }

    pub fn into_vec(self) -> Vec<AgentThought> {
        self.thoughts
    }
}
