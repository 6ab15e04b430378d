//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::client::RequestShape;
use crate::storage::DEFAULT_CONVERSATION;
use crate::stream::Framing;

/// streamchat: terminal client for streaming chat endpoints.
///
/// Sends messages to an HTTP chat endpoint, renders the reply as it
/// streams in, and keeps the conversation in a local database.
#[derive(Parser, Debug)]
#[command(name = "streamchat")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the history database file.
    ///
    /// Defaults to `streamchat/history.db` in the platform data directory.
    #[arg(short, long, env = "STREAMCHAT_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Chat endpoint URL.
    #[arg(short, long, env = "STREAMCHAT_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Conversation name.
    #[arg(
        short,
        long,
        env = "STREAMCHAT_CONVERSATION",
        default_value = DEFAULT_CONVERSATION,
        global = true
    )]
    pub conversation: String,

    /// Request body shape.
    #[arg(long, value_enum, default_value_t = ShapeArg::Conversation, global = true)]
    pub shape: ShapeArg,

    /// How the response body is split into records.
    #[arg(long, value_enum, default_value_t = FramingArg::EventStream, global = true)]
    pub framing: FramingArg,

    /// Bearer token sent with each request.
    #[arg(long, env = "STREAMCHAT_API_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Refuse to send unless signed in with a token.
    #[arg(long, global = true)]
    pub require_auth: bool,

    /// Reply text recorded when a request fails.
    #[arg(long, global = true)]
    pub fallback_text: Option<String>,

    /// Connect timeout in seconds.
    #[arg(long, default_value = "10", global = true)]
    pub connect_timeout: u64,

    /// Keep history in memory only.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one message and stream the reply.
    Send {
        /// Message text (reads from stdin if omitted).
        message: Option<String>,
    },

    /// Interactive chat over stdin.
    ///
    /// Type `/clear` to wipe the conversation and `/quit` to leave.
    /// Ctrl-C stops the reply being streamed.
    Chat,

    /// Show the conversation history.
    History {
        /// Show only the last N messages.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Delete the conversation.
    Clear {
        /// Skip confirmation prompt.
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List stored conversations.
    Conversations,

    /// Show history database status.
    Status,
}

/// `--shape` values.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeArg {
    /// Post the whole conversation.
    Conversation,
    /// Post only the latest message.
    Message,
}

impl From<ShapeArg> for RequestShape {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Conversation => Self::Conversation,
            ShapeArg::Message => Self::Message,
        }
    }
}

/// `--framing` values.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingArg {
    /// `data: ` records, joined across chunks.
    EventStream,
    /// `data: ` records, parsed per chunk.
    ChunkLocal,
    /// Raw text.
    PlainText,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::EventStream => Self::EventStream,
            FramingArg::ChunkLocal => Self::ChunkLocal,
            FramingArg::PlainText => Self::PlainText,
        }
    }
}
