//! Type definitions module
//!
//! Data model shared by the retrieval, agent and conversation layers.

pub mod messages;
pub mod documents;
pub mod thought;
pub mod request;

// Re-export commonly used types
pub use messages::{Role, Turn};
pub use documents::{Metadata, RetrievedDocument, SearchHit};
pub use thought::{AgentThought, ThoughtStep};
pub use request::{ChatFailure, ChatRequest, ChatResponse};
