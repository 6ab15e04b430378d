//! # streamchat
//!
//! Terminal client for streaming chat endpoints.
//!
//! streamchat posts a conversation to an HTTP endpoint and renders the reply
//! while it streams in. Reply bodies are read incrementally, decoded as
//! UTF-8 across chunk boundaries, split into `data: ` records, and surfaced
//! as cumulative text snapshots until the `[DONE]` sentinel or the end of
//! the body.
//!
//! ## Features
//!
//! - **Streaming**: Incremental decoding with selectable record framing
//! - **Cancellation**: In-flight replies stop cleanly on request
//! - **`SQLite` History**: Conversations persist between runs
//! - **Pluggable Auth**: Anonymous or bearer-token providers

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod stream;

// Re-export commonly used types at crate root
pub use error::{AuthError, CommandError, Error, IoError, Result, StorageError, StreamError};

// Re-export core domain types
pub use core::{Message, Role, StreamOutcome, StreamPhase, StreamState, Termination};

// Re-export streaming types
pub use stream::{
    ChannelSink, DONE_SENTINEL, Framing, NullSink, RecordParser, SnapshotSink, StreamConsumer,
    StreamEvent, Utf8Decoder,
};

// Re-export session and transport types
pub use auth::{Anonymous, AuthProvider, StaticTokenAuth, User};
pub use chat::{ChatSession, Reply, SessionSettings};
pub use client::{ChatClient, ChatRequest, RequestShape};
pub use config::Config;

// Re-export storage types
pub use storage::{HistoryStore, MemoryHistoryStore, SqliteHistoryStore};

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
