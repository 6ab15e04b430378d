//! Client side of the chat endpoint.
//!
//! Builds request bodies from conversation history and opens the streamed
//! response. Reading the stream is left to [`crate::stream`].

pub mod http;
pub mod request;

pub use http::{ChatClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_ENDPOINT, MAX_ERROR_BODY};
pub use request::{ChatRequest, RequestShape, WireMessage};
