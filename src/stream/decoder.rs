//! Incremental UTF-8 decoding.
//!
//! Network chunks do not respect character boundaries, so a multi-byte
//! sequence may arrive split across two reads. [`Utf8Decoder`] holds back an
//! incomplete trailing sequence until the rest of it arrives.

/// Stateful UTF-8 decoder fed one chunk at a time.
///
/// Invalid sequences decode to U+FFFD rather than failing.
///
/// # Examples
///
/// ```
/// use streamchat::stream::Utf8Decoder;
///
/// let bytes = "世".as_bytes();
/// let mut decoder = Utf8Decoder::new();
/// assert_eq!(decoder.decode(&bytes[..1]), "");
/// assert_eq!(decoder.decode(&bytes[1..]), "世");
/// ```
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Bytes of an incomplete sequence from the previous chunk.
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Creates a decoder with no pending bytes.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Decodes a chunk, prepending any bytes held back from the last call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(chunk);

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid_up_to]));
                    if let Some(invalid_len) = e.error_len() {
                        out.push(char::REPLACEMENT_CHARACTER);
                        rest = &rest[valid_up_to + invalid_len..];
                    } else {
                        // Truncated sequence at the end: wait for more bytes
                        self.pending = rest[valid_up_to..].to_vec();
                        break;
                    }
                }
            }
        }
        out
    }

    /// Flushes bytes left over at end of stream.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    /// Number of bytes waiting for the rest of their sequence.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
