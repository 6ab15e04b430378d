//! Transient state of one send operation.
//!
//! [`StreamState`] holds the reply text while it streams in, and
//! [`StreamPhase`] tracks where the operation is in its lifecycle:
//!
//! ```text
//! Idle -> Streaming -> { Completed, Errored, Cancelled }
//! ```
//!
//! There is no way back to `Idle`; a new send starts from a fresh state.

use serde::Serialize;
use std::fmt;

use crate::error::{Error, Result};

/// Accumulated reply text of the in-progress stream.
///
/// # Examples
///
/// ```
/// use streamchat::core::StreamState;
///
/// let mut state = StreamState::new();
/// state.append("Hi");
/// state.append(" there");
/// assert_eq!(state.buffer(), "Hi there");
/// state.finish();
/// assert!(state.is_finished());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamState {
    buffer: String,
    finished: bool,
}

impl StreamState {
    /// Creates an empty, unfinished state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
            finished: false,
        }
    }

    /// Appends a payload. Ignored once the state is finished.
    pub fn append(&mut self, payload: &str) {
        if !self.finished {
            self.buffer.push_str(payload);
        }
    }

    /// Marks the stream as finished; the buffer is frozen from here on.
    pub const fn finish(&mut self) {
        self.finished = true;
    }

    /// Current buffer contents.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether the sentinel or end of stream has been observed.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consumes the state, returning the buffer.
    #[must_use]
    pub fn into_buffer(self) -> String {
        self.buffer
    }
}

/// Lifecycle phase of a send operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPhase {
    /// No stream has started.
    #[default]
    Idle,
    /// A stream is being consumed.
    Streaming,
    /// Sentinel or end of stream reached.
    Completed,
    /// The stream failed.
    Errored,
    /// The caller abandoned the stream.
    Cancelled,
}

impl StreamPhase {
    /// Returns `true` for phases that end an operation.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Cancelled)
    }

    /// Moves to `next`, rejecting transitions the lifecycle does not allow.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] for anything other than
    /// `Idle -> Streaming` or `Streaming -> terminal`.
    pub fn transition(self, next: Self) -> Result<Self> {
        let allowed = matches!(
            (self, next),
            (Self::Idle, Self::Streaming)
                | (
                    Self::Streaming,
                    Self::Completed | Self::Errored | Self::Cancelled
                )
        );
        if allowed {
            Ok(next)
        } else {
            Err(Error::InvalidState {
                message: format!("cannot move stream from {self} to {next}"),
            })
        }
    }
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Why a stream stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The `[DONE]` sentinel was received.
    Sentinel,
    /// The producer ran out of chunks.
    EndOfStream,
    /// The caller cancelled the stream.
    Cancelled,
}

/// Result of consuming one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamOutcome {
    /// Final accumulated text.
    pub text: String,
    /// How the stream ended.
    pub termination: Termination,
    /// Number of chunks read from the producer.
    pub chunks: usize,
}
