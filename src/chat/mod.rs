//! Chat sessions.
//!
//! A [`ChatSession`] ties the transport, the stream consumer, a history
//! store and an auth provider together into the send operation.

pub mod session;

pub use session::{ChatSession, DEFAULT_FALLBACK_TEXT, Reply, SessionSettings};
