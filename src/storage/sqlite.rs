//! `SQLite` history store implementation.
//!
//! Persists conversations with transactional replacement, so a failed save
//! never leaves a half-written conversation behind.

// SQLite stores all integers as i64. These casts are intentional and safe
// because we only store non-negative values that fit in usize.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use crate::core::{Message, Role};
use crate::error::{IoError, Result, StorageError};
use crate::storage::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL,
};
use crate::storage::traits::{ConversationSummary, HistoryStats, HistoryStore};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

/// SQLite-based history store for one named conversation.
///
/// # Examples
///
/// ```no_run
/// use streamchat::storage::{HistoryStore, SqliteHistoryStore};
///
/// let mut store = SqliteHistoryStore::open("history.db", "default").unwrap();
/// store.init().unwrap();
/// let messages = store.load().unwrap();
/// ```
pub struct SqliteHistoryStore {
    /// `SQLite` connection.
    conn: Connection,
    /// Path to the database file (None for in-memory).
    path: Option<PathBuf>,
    /// Conversation this store reads and writes.
    conversation: String,
}

impl SqliteHistoryStore {
    /// Opens or creates a database at the given path.
    ///
    /// Missing parent directories are created. Call [`Self::init`] before
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created.
    pub fn open<P: AsRef<Path>>(path: P, conversation: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| IoError::DirectoryFailed {
                path: parent.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(&path).map_err(StorageError::from)?;

        // Use WAL mode for better concurrent access (returns result, use query_row)
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StorageError::from)?;

        Ok(Self {
            conn,
            path: Some(path),
            conversation: conversation.into(),
        })
    }

    /// Creates an in-memory database.
    ///
    /// Useful for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory(conversation: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Ok(Self {
            conn,
            path: None,
            conversation: conversation.into(),
        })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the conversation this store is bound to.
    #[must_use]
    pub fn conversation(&self) -> &str {
        &self.conversation
    }

    /// Creates the schema if missing. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub fn init(&mut self) -> Result<()> {
        if !self.is_initialized()? {
            self.conn
                .execute_batch(SCHEMA_SQL)
                .map_err(StorageError::from)?;
            self.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        }
        Ok(())
    }

    /// Checks if the schema exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    pub fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count > 0)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized()? {
            Ok(())
        } else {
            Err(StorageError::NotInitialized.into())
        }
    }

    /// Gets the current schema version.
    fn get_schema_version(&self) -> Result<Option<u32>> {
        let version: Option<String> = self
            .conn
            .query_row(GET_VERSION_SQL, [], |row| row.get(0))
            .optional()
            .map_err(StorageError::from)?;

        Ok(version.and_then(|v| v.parse().ok()))
    }

    /// Sets the schema version.
    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute(SET_VERSION_SQL, params![version.to_string()])
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Lists stored conversations, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        self.ensure_initialized()?;
        let mut stmt = self
            .conn
            .prepare(
                r"
            SELECT conversation, COUNT(*), MAX(created_at)
            FROM messages
            GROUP BY conversation
            ORDER BY MAX(created_at) DESC, conversation ASC
        ",
            )
            .map_err(StorageError::from)?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(ConversationSummary {
                    name: row.get(0)?,
                    message_count: row.get::<_, i64>(1)? as usize,
                    last_activity: row.get(2)?,
                })
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        Ok(summaries)
    }

    /// Deletes a conversation by name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ConversationNotFound`] if it has no messages.
    pub fn delete_conversation(&mut self, name: &str) -> Result<usize> {
        self.ensure_initialized()?;
        let deleted = self
            .conn
            .execute(
                "DELETE FROM messages WHERE conversation = ?",
                params![name],
            )
            .map_err(StorageError::from)?;
        if deleted == 0 {
            return Err(StorageError::ConversationNotFound {
                name: name.to_string(),
            }
            .into());
        }
        Ok(deleted)
    }

    /// Gets storage statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be gathered.
    pub fn stats(&self) -> Result<HistoryStats> {
        self.ensure_initialized()?;
        let (conversation_count, message_count): (i64, i64) = self
            .conn
            .query_row(
                "SELECT COUNT(DISTINCT conversation), COUNT(*) FROM messages",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(StorageError::from)?;

        let db_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len());

        Ok(HistoryStats {
            conversation_count: conversation_count as usize,
            message_count: message_count as usize,
            schema_version: self.get_schema_version()?.unwrap_or(0),
            db_size,
        })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn load(&self) -> Result<Vec<Message>> {
        self.ensure_initialized()?;
        let mut stmt = self
            .conn
            .prepare(
                r"
            SELECT role, content, is_error, created_at
            FROM messages
            WHERE conversation = ?
            ORDER BY position ASC
        ",
            )
            .map_err(StorageError::from)?;

        let rows = stmt
            .query_map(params![self.conversation], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|(role, content, is_error, created_at)| -> Result<Message> {
                Ok(Message {
                    role: role.parse::<Role>()?,
                    content,
                    created_at,
                    is_error,
                })
            })
            .collect()
    }

    fn save(&mut self, messages: &[Message]) -> Result<()> {
        self.ensure_initialized()?;
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        tx.execute(
            "DELETE FROM messages WHERE conversation = ?",
            params![self.conversation],
        )
        .map_err(StorageError::from)?;

        {
            let mut stmt = tx
                .prepare(
                    r"
                INSERT INTO messages (conversation, position, role, content, is_error, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
            ",
                )
                .map_err(StorageError::from)?;

            for (position, message) in messages.iter().enumerate() {
                stmt.execute(params![
                    self.conversation,
                    position as i64,
                    message.role.as_str(),
                    message.content,
                    message.is_error,
                    message.created_at,
                ])
                .map_err(StorageError::from)?;
            }
        }

        tx.commit()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        tracing::debug!(
            conversation = %self.conversation,
            messages = messages.len(),
            "history saved"
        );
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.conn
            .execute(
                "DELETE FROM messages WHERE conversation = ?",
                params![self.conversation],
            )
            .map_err(StorageError::from)?;
        Ok(())
    }
}
