//! Conversation storage
//!
//! Keeps the turns of every conversation in memory for the lifetime of the
//! store. Injected into the orchestrator; nothing here is global.

pub mod store;

pub use store::{mint_conversation_id, ConversationStore};
