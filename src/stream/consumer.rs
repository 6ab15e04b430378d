//! The stream-to-snapshot loop.
//!
//! [`StreamConsumer`] turns raw byte chunks from a response body into
//! cumulative text snapshots. It can be driven chunk by chunk with
//! [`StreamConsumer::process_chunk`] or handed a whole byte stream with
//! [`StreamConsumer::consume`].

use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use tokio_util::sync::CancellationToken;

use crate::core::{StreamOutcome, StreamPhase, StreamState, Termination};
use crate::error::{Result, StreamError};
use crate::stream::decoder::Utf8Decoder;
use crate::stream::record::{Framing, Payload, RecordParser};
use crate::stream::sink::SnapshotSink;

/// Incremental consumer for one streamed reply.
///
/// A consumer serves exactly one send operation; start a new one for the
/// next reply.
///
/// # Examples
///
/// ```
/// use streamchat::stream::{Framing, StreamConsumer};
///
/// let mut consumer = StreamConsumer::new(Framing::EventStream);
/// let mut snapshots = Vec::new();
/// let mut sink = |s: &str| snapshots.push(s.to_string());
///
/// consumer.process_chunk(b"data: Hi there\n\n", &mut sink);
/// consumer.process_chunk(b"data: [DONE]\n\n", &mut sink);
///
/// assert_eq!(snapshots, vec!["Hi there"]);
/// assert!(consumer.state().is_finished());
/// ```
#[derive(Debug)]
pub struct StreamConsumer {
    decoder: Utf8Decoder,
    parser: RecordParser,
    state: StreamState,
    phase: StreamPhase,
    chunks: usize,
}

impl StreamConsumer {
    /// Creates an idle consumer for the given framing.
    #[must_use]
    pub const fn new(framing: Framing) -> Self {
        Self {
            decoder: Utf8Decoder::new(),
            parser: RecordParser::new(framing),
            state: StreamState::new(),
            phase: StreamPhase::Idle,
            chunks: 0,
        }
    }

    /// Current accumulated state.
    #[must_use]
    pub const fn state(&self) -> &StreamState {
        &self.state
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Feeds one chunk, emitting a snapshot for every appended payload.
    ///
    /// Starts the stream if the consumer is idle. Chunks arriving after the
    /// sentinel, or after the stream has ended, are ignored.
    pub fn process_chunk<K>(&mut self, chunk: &[u8], sink: &mut K)
    where
        K: SnapshotSink + ?Sized,
    {
        if self.phase == StreamPhase::Idle {
            self.phase = StreamPhase::Streaming;
        }
        if self.phase != StreamPhase::Streaming || self.state.is_finished() {
            return;
        }
        self.chunks += 1;
        let text = self.decoder.decode(chunk);
        let payloads = self.parser.push(&text);
        self.apply(payloads, sink);
    }

    /// Flushes held-back bytes and any trailing record at end of stream.
    pub fn end_of_stream<K>(&mut self, sink: &mut K)
    where
        K: SnapshotSink + ?Sized,
    {
        if self.phase != StreamPhase::Streaming || self.state.is_finished() {
            return;
        }
        let tail = self.decoder.finish();
        let mut payloads = self.parser.push(&tail);
        payloads.extend(self.parser.finish());
        self.apply(payloads, sink);
        self.state.finish();
    }

    fn apply<K>(&mut self, payloads: Vec<Payload>, sink: &mut K)
    where
        K: SnapshotSink + ?Sized,
    {
        for payload in payloads {
            match payload {
                Payload::Done => {
                    self.state.finish();
                    break;
                }
                Payload::Data(text) => {
                    self.state.append(&text);
                    sink.snapshot(self.state.buffer());
                }
            }
        }
    }

    /// Consumes a byte stream until the sentinel, end of stream, a transport
    /// failure or cancellation.
    ///
    /// The sink receives a snapshot per appended payload, then exactly one of
    /// `completed` or `failed`. On cancellation neither is called and the
    /// producer is dropped without being polled again.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Transport`] (carrying the partial text) if the
    /// producer yields an error, or [`Error::InvalidState`] if this consumer
    /// has already been used.
    ///
    /// [`Error::InvalidState`]: crate::Error::InvalidState
    pub async fn consume<S, B, E, K>(
        &mut self,
        stream: S,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
        K: SnapshotSink + ?Sized,
    {
        self.phase = self.phase.transition(StreamPhase::Streaming)?;
        let mut stream = std::pin::pin!(stream);

        let termination = loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                item = stream.next() => Some(item),
            };

            match next {
                None => {
                    tracing::debug!(chunks = self.chunks, "stream cancelled");
                    self.phase = self.phase.transition(StreamPhase::Cancelled)?;
                    return Ok(self.outcome(Termination::Cancelled));
                }
                Some(Some(Ok(chunk))) => {
                    self.process_chunk(chunk.as_ref(), sink);
                    if self.state.is_finished() {
                        break Termination::Sentinel;
                    }
                }
                Some(Some(Err(e))) => {
                    self.phase = self.phase.transition(StreamPhase::Errored)?;
                    let err = StreamError::Transport {
                        message: e.to_string(),
                        partial: self.state.buffer().to_string(),
                    };
                    tracing::warn!(chunks = self.chunks, error = %err, "stream failed");
                    sink.failed(&err.to_string());
                    return Err(err.into());
                }
                Some(None) => {
                    self.end_of_stream(sink);
                    break Termination::EndOfStream;
                }
            }
        };

        self.phase = self.phase.transition(StreamPhase::Completed)?;
        tracing::debug!(chunks = self.chunks, ?termination, "stream completed");
        sink.completed(self.state.buffer());
        Ok(self.outcome(termination))
    }

    fn outcome(&self, termination: Termination) -> StreamOutcome {
        StreamOutcome {
            text: self.state.buffer().to_string(),
            termination,
            chunks: self.chunks,
        }
    }
}
