//! Streamed reply consumption.
//!
//! Converts the byte chunks of an HTTP response body into cumulative text
//! snapshots suitable for progressive rendering. The pieces are:
//!
//! - [`Utf8Decoder`]: incremental decoding that survives split characters
//! - [`RecordParser`]: `data: ` record extraction and `[DONE]` detection
//! - [`SnapshotSink`]: where progress goes (closure or channel)
//! - [`StreamConsumer`]: the loop tying them together

pub mod consumer;
pub mod decoder;
pub mod record;
pub mod sink;

pub use consumer::StreamConsumer;
pub use decoder::Utf8Decoder;
pub use record::{DATA_PREFIX, DONE_SENTINEL, Framing, Payload, RECORD_SEPARATOR, RecordParser};
pub use sink::{ChannelSink, NullSink, SnapshotSink, StreamEvent};
