//! RagBuddy - agentic retrieval-augmented question answering
//!
//! Answers questions over a document corpus by combining vector retrieval,
//! optional cross-encoder reranking and language-model generation.
//!
//! # Architecture
//!
//! - **Retrieval**: hybrid vector + rerank scoring (`rag`)
//! - **Refiner**: query rewriting and retrieval-need judgment (`refiner`)
//! - **Agent**: state machine driving rewrite → judge → retrieve → generate (`agent`)
//! - **Events**: streaming and batch adapters over one driver (`events`)
//! - **Conversation**: process-wide in-memory turn log (`conversation`)

pub mod errors;
pub mod types;
pub mod config;

// Collaborators
pub mod backends;

// Core pipeline
pub mod rag;
pub mod refiner;
pub mod agent;
pub mod events;
pub mod conversation;

// Interface layer
pub mod cli;
pub mod doctor;

// Re-export commonly used types
pub use agent::{Orchestrator, OrchestratorConfig};
pub use config::Config;
pub use conversation::ConversationStore;
pub use errors::{RagError, Result};
pub use events::{EventStream, StreamEvent};
pub use types::{ChatRequest, ChatResponse};
