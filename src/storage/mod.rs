//! Storage layer for streamchat.
//!
//! Provides chat history persistence behind the [`HistoryStore`] trait,
//! with a `SQLite` backend for durable history and an in-memory backend
//! for throwaway sessions.

pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

use std::path::PathBuf;

pub use memory::MemoryHistoryStore;
pub use schema::{CURRENT_SCHEMA_VERSION, SCHEMA_SQL};
pub use sqlite::SqliteHistoryStore;
pub use traits::{ConversationSummary, HistoryStats, HistoryStore};

/// Default database file name.
pub const DEFAULT_DB_NAME: &str = "history.db";

/// Fallback database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".streamchat/history.db";

/// Default conversation name.
pub const DEFAULT_CONVERSATION: &str = "default";

/// Returns the default database location.
///
/// Uses the platform data directory when one exists, otherwise
/// [`DEFAULT_DB_PATH`].
#[must_use]
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir().map_or_else(
        || PathBuf::from(DEFAULT_DB_PATH),
        |dir| dir.join("streamchat").join(DEFAULT_DB_NAME),
    )
}
