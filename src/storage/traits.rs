//! History store trait definition.
//!
//! Defines the interface for chat history persistence, enabling pluggable
//! storage implementations.

use crate::core::Message;
use crate::error::Result;
use serde::Serialize;

/// Trait for chat history backends.
///
/// A store holds one conversation; which one is decided when the store is
/// opened.
pub trait HistoryStore: Send {
    /// Loads the conversation, oldest message first.
    ///
    /// Returns an empty list if nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or deserialization fails.
    fn load(&self) -> Result<Vec<Message>>;

    /// Replaces the stored conversation with `messages`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the previous contents are kept.
    fn save(&mut self, messages: &[Message]) -> Result<()>;

    /// Deletes the stored conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn clear(&mut self) -> Result<()> {
        self.save(&[])
    }
}

/// Summary of one stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    /// Conversation name.
    pub name: String,
    /// Number of stored messages.
    pub message_count: usize,
    /// Unix timestamp of the newest message.
    pub last_activity: i64,
}

/// History storage statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HistoryStats {
    /// Number of conversations stored.
    pub conversation_count: usize,
    /// Total number of messages across conversations.
    pub message_count: usize,
    /// Schema version.
    pub schema_version: u32,
    /// Database file size in bytes (if applicable).
    pub db_size: Option<u64>,
}
