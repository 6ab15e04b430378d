//! Core domain models for streamchat.
//!
//! This module contains the data structures shared by every layer: chat
//! messages and the transient state of a streaming reply. These are pure
//! domain models with no I/O dependencies.

pub mod message;
pub mod state;

pub use message::{Message, Role};
pub use state::{StreamOutcome, StreamPhase, StreamState, Termination};
