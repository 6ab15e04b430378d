//! Error types for streamchat operations.
//!
//! This module provides the error hierarchy using `thiserror` for stream
//! consumption, HTTP transport, history storage, authentication, and CLI
//! commands.

use thiserror::Error;

/// Result type alias for streamchat operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for streamchat operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Streaming errors (transport, HTTP status, unusable body).
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// Storage-related errors (history persistence).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Authentication errors.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// I/O errors (terminal and file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// The message to send was empty or whitespace only.
    #[error("message is empty")]
    EmptyMessage,

    /// Invalid state errors.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the invalid state.
        message: String,
    },

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Terminal failures of a single send operation.
///
/// None of these are retried; the caller decides what to show the user.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Network or connection failure, before or during the stream.
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable cause.
        message: String,
        /// Text accumulated before the failure.
        partial: String,
    },

    /// The endpoint answered with a non-success status.
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// Response body, read best-effort.
        body: String,
    },

    /// The response cannot be consumed as a text stream.
    #[error("response has no consumable body stream: {reason}")]
    UnsupportedStream {
        /// Why the body was rejected.
        reason: String,
    },
}

impl StreamError {
    /// Text accumulated before the failure, if any.
    #[must_use]
    pub fn partial(&self) -> &str {
        match self {
            Self::Transport { partial, .. } => partial,
            Self::HttpStatus { .. } | Self::UnsupportedStream { .. } => "",
        }
    }
}

/// Storage-specific errors for database operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// Storage not initialized.
    #[error("history database not initialized")]
    NotInitialized,

    /// Conversation not found in storage.
    #[error("conversation not found: {name}")]
    ConversationNotFound {
        /// Conversation name that was not found.
        name: String,
    },

    /// Transaction error.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Authentication errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// A send was attempted without an authenticated user.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The provider refused the login.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// The provider does not support the requested operation.
    #[error("operation not supported by {provider}")]
    Unsupported {
        /// Provider name.
        provider: &'static str,
    },
}

/// I/O-specific errors.
#[derive(Error, Debug)]
pub enum IoError {
    /// Failed to read input.
    #[error("failed to read input: {reason}")]
    ReadFailed {
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write output.
    #[error("failed to write output: {reason}")]
    WriteFailed {
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),
}

// Implement From traits for external errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };
        Self::Transport {
            message,
            partial: String::new(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Stream(err.into())
    }
}
