//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::chat::Reply;
use crate::core::Message;
use crate::error::Error;
use crate::storage::{ConversationSummary, HistoryStats};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats a conversation transcript.
#[must_use]
pub fn format_history(conversation: &str, messages: &[Message], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_history_text(conversation, messages),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct History<'a> {
                conversation: &'a str,
                messages: &'a [Message],
            }
            format_json(&History {
                conversation,
                messages,
            })
        }
    }
}

fn format_history_text(conversation: &str, messages: &[Message]) -> String {
    if messages.is_empty() {
        return format!("No messages in conversation '{conversation}'.\n");
    }

    let mut output = String::new();
    for message in messages {
        let marker = if message.is_error { " [error]" } else { "" };
        let _ = writeln!(output, "{}{marker}: {}", message.sender(), message.content);
    }
    output
}

/// Formats a committed reply.
///
/// Text output is only the trailing newline; the reply itself has already
/// been streamed to the terminal.
#[must_use]
pub fn format_reply(reply: &Reply, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => "\n".to_string(),
        OutputFormat::Json => format_json(reply),
    }
}

/// Formats the list of stored conversations.
#[must_use]
pub fn format_conversations(conversations: &[ConversationSummary], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_conversations_text(conversations),
        OutputFormat::Json => format_json(&conversations),
    }
}

fn format_conversations_text(conversations: &[ConversationSummary]) -> String {
    if conversations.is_empty() {
        return "No conversations found.\n".to_string();
    }

    let mut output = String::new();
    output.push_str("Conversations:\n");
    let _ = writeln!(output, "{:<24} {:<10} Last activity", "Name", "Messages");
    output.push_str(&"-".repeat(50));
    output.push('\n');

    for summary in conversations {
        let _ = writeln!(
            output,
            "{:<24} {:<10} {}",
            truncate(&summary.name, 24),
            summary.message_count,
            summary.last_activity
        );
    }
    output
}

/// Formats a status response.
#[must_use]
pub fn format_status(stats: &HistoryStats, db_path: &Path, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(stats, db_path),
        OutputFormat::Json => format_json(stats),
    }
}

fn format_status_text(stats: &HistoryStats, db_path: &Path) -> String {
    let mut output = String::new();
    output.push_str("streamchat status\n");
    output.push_str("=================\n\n");
    let _ = writeln!(output, "  Database:       {}", db_path.display());
    let _ = writeln!(output, "  Conversations:  {}", stats.conversation_count);
    let _ = writeln!(output, "  Messages:       {}", stats.message_count);
    let _ = writeln!(output, "  Schema:         v{}", stats.schema_version);
    if let Some(size) = stats.db_size {
        let _ = writeln!(output, "  DB size:        {size} bytes");
    }
    output
}

/// Formats the result of clearing a conversation.
#[must_use]
pub fn format_cleared(conversation: &str, deleted: usize, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            format!("Cleared conversation '{conversation}' ({deleted} messages).\n")
        }
        OutputFormat::Json => format_json(&serde_json::json!({
            "conversation": conversation,
            "deleted": deleted,
        })),
    }
}

/// Formats an error for display.
///
/// Text output is the bare message; JSON output is a single-line object
/// with the message under `error`.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            let mut value = serde_json::json!({ "error": error.to_string() });
            if let Error::Stream(stream) = error
                && !stream.partial().is_empty()
            {
                value["partial"] = serde_json::Value::from(stream.partial());
            }
            value.to_string()
        }
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    json.push('\n');
    json
}

/// Truncates a string to `max_len` graphemes with an ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let graphemes: Vec<&str> = s.graphemes(true).collect();
    if graphemes.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        graphemes[..max_len].concat()
    } else {
        format!("{}...", graphemes[..max_len - 3].concat())
    }
}
