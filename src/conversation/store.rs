//! In-memory conversation store
//!
//! Keyed append log of turns. Mutation of one key is serialized by the
//! map's per-shard lock; operations on different keys need no ordering.

use dashmap::DashMap;
use tracing::debug;

use crate::errors::{RagError, Result};
use crate::types::Turn;

/// Mint a fresh opaque conversation identifier (`conv_` + 8 hex chars)
pub fn mint_conversation_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("conv_{}", &id[..8])
}

/// Process-wide conversation log
///
/// Conversations are created lazily on first append and live until
/// explicitly deleted. No expiry.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: DashMap<String, Vec<Turn>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one turn
    pub fn append(&self, conversation_id: &str, turn: Turn) {
        self.append_all(conversation_id, std::iter::once(turn));
    }

    /// Append several turns under one lock, so readers never observe a
    /// partial exchange
    pub fn append_all(&self, conversation_id: &str, turns: impl IntoIterator<Item = Turn>) {
        let mut entry = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();

        for mut turn in turns {
            // Keep timestamps monotonic even if the wall clock steps back
            if let Some(last) = entry.last() {
                if turn.timestamp < last.timestamp {
                    turn.timestamp = last.timestamp;
                }
            }
            entry.push(turn);
        }

        debug!(conversation_id, turns = entry.len(), "conversation appended");
    }

    /// All turns of a conversation, in append order
    pub fn get(&self, conversation_id: &str) -> Result<Vec<Turn>> {
        self.conversations
            .get(conversation_id)
            .map(|turns| turns.clone())
            .ok_or_else(|| RagError::NotFound(conversation_id.to_string()))
    }

    /// Remove a conversation and all of its turns
    pub fn delete(&self, conversation_id: &str) -> Result<()> {
        self.conversations
            .remove(conversation_id)
            .map(|_| debug!(conversation_id, "conversation deleted"))
            .ok_or_else(|| RagError::NotFound(conversation_id.to_string()))
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.conversations.contains_key(conversation_id)
    }

    /// Number of stored conversations
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Identifiers of all stored conversations, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.conversations.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
