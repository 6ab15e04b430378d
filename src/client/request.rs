//! Request bodies posted to the chat endpoint.

use serde::Serialize;

use crate::core::{Message, Role};

/// Which JSON body the endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestShape {
    /// `{"messages": [{"role": ..., "content": ...}, ...]}`
    #[default]
    Conversation,
    /// `{"message": "..."}` carrying only the latest user text.
    Message,
}

/// One conversation entry as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    /// Author role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

/// Body of a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatRequest {
    /// Whole conversation, oldest first.
    Conversation {
        /// Ordered messages.
        messages: Vec<WireMessage>,
    },
    /// Single message.
    Message {
        /// Latest user text.
        message: String,
    },
}

impl ChatRequest {
    /// Builds a request from history whose last entry is the new user message.
    ///
    /// Fallback text from failed replies is left out of the conversation.
    ///
    /// # Examples
    ///
    /// ```
    /// use streamchat::client::{ChatRequest, RequestShape};
    /// use streamchat::core::Message;
    ///
    /// let history = vec![Message::user("Hello")];
    /// let body = ChatRequest::build(RequestShape::Message, &history);
    /// assert_eq!(
    ///     serde_json::to_string(&body).unwrap(),
    ///     r#"{"message":"Hello"}"#
    /// );
    /// ```
    #[must_use]
    pub fn build(shape: RequestShape, history: &[Message]) -> Self {
        match shape {
            RequestShape::Conversation => Self::Conversation {
                messages: history
                    .iter()
                    .filter(|m| !m.is_error)
                    .map(|m| WireMessage {
                        role: m.role,
                        content: m.content.clone(),
                    })
                    .collect(),
            },
            RequestShape::Message => Self::Message {
                message: history
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.clone())
                    .unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_body() {
        let history = vec![
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("how are you?"),
        ];
        let body = ChatRequest::build(RequestShape::Conversation, &history);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "how are you?"}
                ]
            })
        );
    }

    #[test]
    fn test_conversation_skips_error_messages() {
        let history = vec![
            Message::user("first"),
            Message::error("An error occurred."),
            Message::user("retry"),
        ];
        let ChatRequest::Conversation { messages } =
            ChatRequest::build(RequestShape::Conversation, &history)
        else {
            panic!("expected conversation body");
        };
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.role == Role::User));
    }

    #[test]
    fn test_message_body_uses_latest_user_text() {
        let history = vec![
            Message::user("old"),
            Message::assistant("reply"),
            Message::user("new"),
        ];
        let body = ChatRequest::build(RequestShape::Message, &history);
        assert_eq!(
            body,
            ChatRequest::Message {
                message: "new".to_string()
            }
        );
    }
}
