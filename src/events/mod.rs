//! Orchestrator output adapters
//!
//! The orchestrator emits abstract step results into a [`StepSink`]. Two
//! adapters sit on top: [`ChannelSink`] forwards them as an incremental
//! [`StreamEvent`] sequence, [`CollectingSink`] folds them into one
//! aggregate result.

pub mod channel;
pub mod collect;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::rag::context::truncate_chars;
use crate::types::{AgentThought, ChatFailure, ChatResponse, Metadata, RetrievedDocument};

pub use channel::{ChannelSink, EventStream, STREAM_BUFFER};
pub use collect::CollectingSink;

/// Characters of document content carried by a `source` event
pub const SOURCE_PREVIEW_CHARS: usize = 200;

/// One observable result of an orchestration step
#[derive(Debug, Clone)]
pub enum StepResult {
    /// A thought was appended to the run's trail
    Thought(AgentThought),

    /// A generated text fragment (streamed generation only)
    Chunk(String),

    /// Run finished; terminal
    Completed(ChatResponse),

    /// Run ended in the error state; terminal
    Failed(ChatFailure),
}

/// Receiver of step results, in execution order
///
/// An `Err` from `accept` means the consumer is gone and the run must stop.
#[async_trait]
pub trait StepSink: Send {
    async fn accept(&mut self, step: StepResult) -> Result<()>;
}

/// Wire event of the incremental interface
///
/// Serializes as `{"type": "<tag>", "data": {...}}`. The tag set is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum StreamEvent {
    Thought(AgentThought),

    Chunk {
        text: String,
    },

    #[serde(rename_all = "camelCase")]
    Complete {
        answer: String,
        conversation_id: String,
        elapsed_time: f64,
    },

    Source {
        index: usize,
        content: String,
        metadata: Metadata,
        score: f32,
    },

    ThoughtsSummary {
        count: usize,
        thoughts: Vec<AgentThought>,
    },

    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        conversation_id: String,
        thoughts: Vec<AgentThought>,
    },

    /// End-of-stream marker
    Done,
}

impl StreamEvent {
    /// Tag as it appears on the wire
    pub fn tag(&self) -> &'static str {
        match self {
            StreamEvent::Thought(_) => "thought",
            StreamEvent::Chunk { .. } => "chunk",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Source { .. } => "source",
            StreamEvent::ThoughtsSummary { .. } => "thoughtsSummary",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }

    /// `source` event for the document at 1-based `index`
    pub fn source(index: usize, doc: &RetrievedDocument) -> Self {
        let preview = truncate_chars(&doc.content, SOURCE_PREVIEW_CHARS);
        let content = if preview.len() < doc.content.len() {
            format!("{}...", preview)
        } else {
            preview.to_string()
        };

        StreamEvent::Source {
            index,
            content,
            metadata: doc.metadata.clone(),
            score: doc.rank_score(),
        }
    }

    /// Expand one step result into the events that represent it
    pub fn from_step(step: StepResult) -> Vec<StreamEvent> {
        match step {
            StepResult::Thought(thought) => vec![StreamEvent::Thought(thought)],
            StepResult::Chunk(text) => vec![StreamEvent::Chunk { text }],
            StepResult::Completed(response) => {
                let mut events = Vec::with_capacity(response.sources.len() + 2);
                events.push(StreamEvent::Complete {
                    answer: response.answer,
                    conversation_id: response.conversation_id,
                    elapsed_time: response.elapsed_time,
                });
                events.extend(
                    response
                        .sources
                        .iter()
                        .enumerate()
                        .map(|(i, doc)| StreamEvent::source(i + 1, doc)),
                );
                events.push(StreamEvent::ThoughtsSummary {
                    count: response.thought_trail.len(),
                    thoughts: response.thought_trail,
                });
                events
            }
            StepResult::Failed(failure) => vec![StreamEvent::Error {
                message: failure.error,
                conversation_id: failure.conversation_id,
                thoughts: failure.thought_trail,
            }],
        }
    }
}
