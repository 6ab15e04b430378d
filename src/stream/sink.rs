//! Delivery of stream progress to the caller.
//!
//! Rendering is not the consumer's business: it reports snapshots through a
//! [`SnapshotSink`], which can be a plain closure or a channel feeding
//! another task.

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Receiver of stream progress.
///
/// Only [`SnapshotSink::snapshot`] is required; terminal notifications
/// default to no-ops.
pub trait SnapshotSink {
    /// Called with the whole accumulated buffer after each appended payload.
    fn snapshot(&mut self, buffer: &str);

    /// Called once with the final text when the stream ends cleanly.
    fn completed(&mut self, _text: &str) {}

    /// Called once with a human-readable cause when the stream fails.
    fn failed(&mut self, _cause: &str) {}
}

impl<F> SnapshotSink for F
where
    F: FnMut(&str),
{
    fn snapshot(&mut self, buffer: &str) {
        self(buffer);
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn snapshot(&mut self, _buffer: &str) {}
}

/// Event forwarded by a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Cumulative buffer after an appended payload.
    Snapshot(String),
    /// Final text of a cleanly ended stream.
    Completed(String),
    /// Cause of a failed stream.
    Failed(String),
}

impl StreamEvent {
    /// Returns `true` if no further events follow this one.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// Sink that forwards events over an unbounded tokio channel.
///
/// Sends after the receiver is dropped are silently discarded.
///
/// # Examples
///
/// ```
/// use streamchat::stream::{ChannelSink, SnapshotSink, StreamEvent};
///
/// let (mut sink, mut rx) = ChannelSink::channel();
/// sink.snapshot("Hi");
/// assert_eq!(rx.try_recv().ok(), Some(StreamEvent::Snapshot("Hi".to_string())));
/// ```
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver for its events.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Creates a sink whose events are exposed as a `Stream`.
    #[must_use]
    pub fn stream() -> (Self, UnboundedReceiverStream<StreamEvent>) {
        let (sink, rx) = Self::channel();
        (sink, UnboundedReceiverStream::new(rx))
    }
}

impl SnapshotSink for ChannelSink {
    fn snapshot(&mut self, buffer: &str) {
        let _ = self.tx.send(StreamEvent::Snapshot(buffer.to_string()));
    }

    fn completed(&mut self, text: &str) {
        let _ = self.tx.send(StreamEvent::Completed(text.to_string()));
    }

    fn failed(&mut self, cause: &str) {
        let _ = self.tx.send(StreamEvent::Failed(cause.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |s: &str| seen.push(s.to_string());
            sink.snapshot("a");
            sink.snapshot("ab");
            sink.completed("ab");
        }
        assert_eq!(seen, vec!["a", "ab"]);
    }

    #[test]
    fn test_channel_sink_forwards_all_events() {
        let (mut sink, mut rx) = ChannelSink::channel();
        sink.snapshot("x");
        sink.completed("x");
        sink.failed("boom");

        assert_eq!(rx.try_recv().unwrap(), StreamEvent::Snapshot("x".to_string()));
        let completed = rx.try_recv().unwrap();
        assert!(completed.is_terminal());
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::Failed("boom".to_string()));
    }

    #[test]
    fn test_channel_sink_after_receiver_dropped() {
        let (mut sink, rx) = ChannelSink::channel();
        drop(rx);
        sink.snapshot("ignored");
    }
}
