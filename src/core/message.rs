//! Chat messages.
//!
//! A conversation is an ordered list of [`Message`]s alternating between
//! the user and the assistant. Messages are pure data; persistence lives in
//! the storage layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StorageError;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the user.
    User,
    /// Text streamed back by the endpoint.
    Assistant,
}

impl Role {
    /// Returns the wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(StorageError::Serialization(format!("unknown role: {other}"))),
        }
    }
}

/// A single entry in a conversation.
///
/// # Examples
///
/// ```
/// use streamchat::core::{Message, Role};
///
/// let msg = Message::user("Hello");
/// assert_eq!(msg.role, Role::User);
/// assert!(!msg.is_error);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,

    /// Message text.
    pub content: String,

    /// Unix timestamp when the message was committed.
    #[serde(default)]
    pub created_at: i64,

    /// Fallback text recorded after a failed stream.
    ///
    /// Kept for display, never sent back to the endpoint.
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    /// Creates a message with the current timestamp.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: current_timestamp(),
            is_error: false,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates an assistant message holding fallback text for a failed reply.
    #[must_use]
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::assistant(content)
        }
    }

    /// Returns the display label for the author.
    #[must_use]
    pub const fn sender(&self) -> &'static str {
        match self.role {
            Role::User => "You",
            Role::Assistant => "Bot",
        }
    }
}

/// Returns current Unix timestamp.
#[allow(clippy::cast_possible_wrap)]
pub(crate) fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
