//! Record framing for decoded stream text.
//!
//! The endpoint sends records terminated by a blank line. Text records carry
//! a `data: ` marker and the stream ends with a `[DONE]` payload:
//!
//! ```text
//! data: Hello
//!
//! data: , world
//!
//! data: [DONE]
//!
//! ```
//!
//! How records that straddle chunk boundaries are handled depends on the
//! [`Framing`] mode.

use serde::Serialize;

/// Separator between records.
pub const RECORD_SEPARATOR: &str = "\n\n";

/// Marker prefixing text payload records.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that ends the logical message stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// How decoded text is cut into payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    /// Event-stream records; an incomplete trailing record waits for the
    /// next chunk.
    #[default]
    EventStream,
    /// Event-stream records split per chunk, with no carry-over.
    ChunkLocal,
    /// No framing: every decoded chunk is one payload.
    PlainText,
}

/// One unit extracted from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Text to append to the reply.
    Data(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Splits decoded text into [`Payload`]s according to a [`Framing`] mode.
///
/// # Examples
///
/// ```
/// use streamchat::stream::{Framing, Payload, RecordParser};
///
/// let mut parser = RecordParser::new(Framing::EventStream);
/// assert!(parser.push("data: Hi").is_empty());
/// assert_eq!(
///     parser.push(" there\n\ndata: [DONE]\n\n"),
///     vec![Payload::Data("Hi there".to_string()), Payload::Done]
/// );
/// ```
#[derive(Debug, Default)]
pub struct RecordParser {
    framing: Framing,
    /// Incomplete trailing record (event-stream mode only).
    carry: String,
}

impl RecordParser {
    /// Creates a parser for the given framing.
    #[must_use]
    pub const fn new(framing: Framing) -> Self {
        Self {
            framing,
            carry: String::new(),
        }
    }

    /// Returns the framing mode.
    #[must_use]
    pub const fn framing(&self) -> Framing {
        self.framing
    }

    /// Feeds decoded text and returns the payloads it completes.
    ///
    /// Parsing stops at the first `[DONE]`; records after it in the same
    /// text are dropped.
    pub fn push(&mut self, text: &str) -> Vec<Payload> {
        match self.framing {
            Framing::PlainText => {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Payload::Data(text.to_string())]
                }
            }
            Framing::ChunkLocal => parse_records(text),
            Framing::EventStream => {
                self.carry.push_str(text);
                let Some(pos) = self.carry.rfind(RECORD_SEPARATOR) else {
                    return Vec::new();
                };
                let complete: String = self
                    .carry
                    .drain(..pos + RECORD_SEPARATOR.len())
                    .collect();
                parse_records(&complete)
            }
        }
    }

    /// Parses whatever is left once the producer has ended.
    pub fn finish(&mut self) -> Vec<Payload> {
        let rest = std::mem::take(&mut self.carry);
        if rest.is_empty() {
            return Vec::new();
        }
        parse_records(&rest)
    }
}

/// Extracts payloads from a run of separator-delimited records.
fn parse_records(text: &str) -> Vec<Payload> {
    let mut payloads = Vec::new();
    for record in text.split(RECORD_SEPARATOR) {
        let Some(payload) = record.strip_prefix(DATA_PREFIX) else {
            continue;
        };
        if payload == DONE_SENTINEL {
            payloads.push(Payload::Done);
            break;
        }
        payloads.push(Payload::Data(payload.to_string()));
    }
    payloads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(s: &str) -> Payload {
        Payload::Data(s.to_string())
    }

    #[test]
    fn test_multiple_records_in_order() {
        let mut parser = RecordParser::new(Framing::EventStream);
        let payloads = parser.push("data: a\n\ndata: b\n\ndata: c\n\n");
        assert_eq!(payloads, vec![data("a"), data("b"), data("c")]);
    }

    #[test]
    fn test_unprefixed_records_ignored() {
        let payloads = parse_records(": keep-alive\n\n\n\nevent: ping\n\ndata: x\n\n");
        assert_eq!(payloads, vec![data("x")]);
    }

    #[test]
    fn test_stops_at_first_sentinel() {
        let payloads = parse_records("data: a\n\ndata: [DONE]\n\ndata: b\n\n");
        assert_eq!(payloads, vec![data("a"), Payload::Done]);
    }

    #[test]
    fn test_sentinel_must_match_exactly() {
        let payloads = parse_records("data: [DONE] \n\n");
        assert_eq!(payloads, vec![data("[DONE] ")]);
    }

    #[test]
    fn test_event_stream_carries_partial_record() {
        let mut parser = RecordParser::new(Framing::EventStream);
        assert!(parser.push("data: Hel").is_empty());
        assert_eq!(parser.push("lo, data: \n\n"), vec![data("Hello, data: ")]);
    }

    #[test]
    fn test_chunk_local_splits_each_chunk() {
        let mut parser = RecordParser::new(Framing::ChunkLocal);
        assert_eq!(parser.push("data: Hel"), vec![data("Hel")]);
        assert!(parser.push("lo, data: \n\n").is_empty());
    }

    #[test]
    fn test_separator_split_across_chunks() {
        let mut parser = RecordParser::new(Framing::EventStream);
        assert!(parser.push("data: one\n").is_empty());
        assert_eq!(parser.push("\ndata: two"), vec![data("one")]);
        assert_eq!(parser.finish(), vec![data("two")]);
    }

    #[test]
    fn test_finish_without_carry() {
        let mut parser = RecordParser::new(Framing::EventStream);
        parser.push("data: x\n\n");
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn test_plain_text_passthrough() {
        let mut parser = RecordParser::new(Framing::PlainText);
        assert_eq!(parser.push("data: raw\n\n"), vec![data("data: raw\n\n")]);
        assert!(parser.push("").is_empty());
        assert!(parser.finish().is_empty());
    }
}
