//! Batch adapter: folds step results into one aggregate result

use async_trait::async_trait;

use crate::errors::{RagError, Result};
use crate::events::{StepResult, StepSink};
use crate::types::{AgentThought, ChatResponse};

#[derive(Debug, Default)]
pub struct CollectingSink {
    thoughts: Vec<AgentThought>,
    chunks: usize,
    outcome: Option<StepResult>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thoughts observed so far, in arrival order
    pub fn thoughts(&self) -> &[AgentThought] {
        &self.thoughts
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Aggregate response, or the run's failure with its partial trail
    pub fn into_result(self) -> Result<ChatResponse> {
        match self.outcome {
            Some(StepResult::Completed(response)) => Ok(response),
            Some(StepResult::Failed(failure)) => Err(RagError::RunFailed(Box::new(failure))),
            _ => Err(RagError::Generic(
                "run ended without a terminal result".to_string(),
            )),
        }
    }
}

#[async_trait]
impl StepSink for CollectingSink {
    async fn accept(&mut self, step: StepResult) -> Result<()> {
        match step {
            StepResult::Thought(thought) => self.thoughts.push(thought),
            StepResult::Chunk(_) => self.chunks += 1,
            terminal => self.outcome = Some(terminal),
        }
        Ok(())
    }
}
