//! Agent orchestration module
//!
//! State machine, per-run thought log, and the orchestrator driving them.

pub mod state;
pub mod trail;
pub mod orchestrator;

// Re-export commonly used types
pub use state::{AgentState, StateEvent};
pub use trail::ThoughtLog;
pub use orchestrator::{GenerationMode, Orchestrator, OrchestratorConfig, DEEPER_QUERY_MAX_TOKENS};
