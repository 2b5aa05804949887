//! Line decoder for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for the residual buffer.
//! Implements a state machine for handling fragmented input:
//! - `ScanningLine`: Looking for the next `\n`
//! - `AwaitingBinary`: A `binary: N` line was seen, need N payload bytes plus the trailing `\n`
//!
//! Binary bytes are never text decoded, so a segment may contain any byte
//! value including `\n`. The token sequence does not depend on how the
//! transport splits the stream into chunks.
//!
//! # Example
//!
//! ```
//! use mpc_client::protocol::{LineDecoder, Token};
//!
//! let mut decoder = LineDecoder::new();
//!
//! assert!(decoder.push(b"volume: 5").unwrap().is_empty());
//! let tokens = decoder.push(b"0\nOK\n").unwrap();
//!
//! assert_eq!(tokens, vec![Token::Line("volume: 50".into()), Token::Line("OK".into())]);
//! ```

use bytes::{Buf, Bytes, BytesMut};

use super::wire_format::{parse_binary_length, LF};
use crate::error::{MpcError, Result};

/// Default limit for a single binary segment (64 MiB).
pub const DEFAULT_MAX_BINARY_SIZE: usize = 64 * 1024 * 1024;

/// A unit produced by the [`LineDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A text line without its `\n`.
    Line(String),
    /// The payload of a binary segment, without the trailing `\n`.
    Binary(Bytes),
}

/// State machine for line parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Looking for the next line feed.
    ScanningLine,
    /// Binary announcement parsed, waiting for `len` payload bytes and the delimiter.
    AwaitingBinary { len: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete tokens.
pub struct LineDecoder {
    /// Bytes not yet consumed by a token.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Largest accepted binary segment.
    max_binary_size: usize,
    /// Offset up to which the buffer is known to hold no line feed.
    scanned: usize,
    /// Framing error found after tokens that were already returned.
    deferred: Option<MpcError>,
}

impl LineDecoder {
    /// Create a new decoder with default settings.
    pub fn new() -> Self {
        Self::with_max_binary(DEFAULT_MAX_BINARY_SIZE)
    }

    /// Create a new decoder with a custom binary segment limit.
    pub fn with_max_binary(max_binary_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            state: State::ScanningLine,
            max_binary_size,
            scanned: 0,
            deferred: None,
        }
    }

    /// Push data into the decoder and extract all complete tokens.
    ///
    /// Partial lines and partial binary segments stay buffered for the next
    /// push.
    ///
    /// # Errors
    ///
    /// Returns a framing error if a binary announcement is malformed or
    /// exceeds the configured limit. Tokens completed before the bad line are
    /// returned first; the error is then held back and reported by
    /// [`take_error`](Self::take_error) or the next push, so the outcome does
    /// not depend on where the chunk boundaries fall.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Token>> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        self.buffer.extend_from_slice(data);

        let mut tokens = Vec::new();
        loop {
            match self.try_extract_one() {
                Ok(Some(token)) => tokens.push(token),
                Ok(None) => break,
                Err(err) if tokens.is_empty() => return Err(err),
                Err(err) => {
                    self.deferred = Some(err);
                    break;
                }
            }
        }

        Ok(tokens)
    }

    /// Take the framing error held back by the last push, if any.
    pub fn take_error(&mut self) -> Option<MpcError> {
        self.deferred.take()
    }

    fn try_extract_one(&mut self) -> Result<Option<Token>> {
        loop {
            match self.state {
                State::ScanningLine => {
                    let Some(pos) = self.buffer[self.scanned..]
                        .iter()
                        .position(|&b| b == LF)
                    else {
                        self.scanned = self.buffer.len();
                        return Ok(None);
                    };

                    let raw = self.buffer.split_to(self.scanned + pos);
                    self.buffer.advance(1);
                    self.scanned = 0;

                    let line = String::from_utf8_lossy(&raw).into_owned();

                    match parse_binary_length(&line) {
                        None => return Ok(Some(Token::Line(line))),
                        Some(Err(bad)) => {
                            return Err(MpcError::Framing(format!(
                                "Malformed binary announcement: {:?}",
                                bad
                            )));
                        }
                        Some(Ok(len)) if len > self.max_binary_size => {
                            return Err(MpcError::Framing(format!(
                                "Binary size {} exceeds maximum {}",
                                len, self.max_binary_size
                            )));
                        }
                        Some(Ok(len)) => {
                            self.state = State::AwaitingBinary { len };
                        }
                    }
                }

                State::AwaitingBinary { len } => {
                    // payload plus the trailing delimiter
                    if self.buffer.len() <= len {
                        return Ok(None);
                    }

                    let payload = self.buffer.split_to(len).freeze();
                    self.buffer.advance(1);
                    self.state = State::ScanningLine;

                    return Ok(Some(Token::Binary(payload)));
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::ScanningLine;
        self.scanned = 0;
        self.deferred = None;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::ScanningLine => "ScanningLine",
            State::AwaitingBinary { .. } => "AwaitingBinary",
        }
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
