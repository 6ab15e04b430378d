//! In-process history store.

use crate::core::Message;
use crate::error::Result;
use crate::storage::traits::HistoryStore;

/// History store that keeps messages in memory only.
///
/// Used for `--ephemeral` sessions and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistoryStore {
    messages: Vec<Message>,
}

impl MemoryHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Creates a store pre-filled with `messages`.
    #[must_use]
    pub const fn with_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<Message>> {
        Ok(self.messages.clone())
    }

    fn save(&mut self, messages: &[Message]) -> Result<()> {
        self.messages = messages.to_vec();
        Ok(())
    }
}
