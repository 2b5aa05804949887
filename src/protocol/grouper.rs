//! Grouping of tokens into protocol-level response units.
//!
//! The grouper has two states:
//! - `AwaitingGreeting`: the first line must be `OK <ident> <major>.<minor>.<patch>`
//! - `Active`: content lines accumulate until a terminator
//!
//! In `Active`, `OK` closes a response, `list_OK` closes one command-list member
//! (the list's final `OK` then closes nothing further), and an `ACK` line
//! emits a failure and abandons the rest of any open list.

use bytes::Bytes;

use super::line_decoder::Token;
use super::wire_format::{parse_ack, parse_greeting, Version, ACK_PREFIX, LIST_OK, OK};
use crate::error::{AckError, MpcError, Result};

/// Payload of a successful response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Content lines, in order, without terminators.
    pub lines: Vec<String>,
    /// Binary segment, if the response carried one.
    pub binary: Option<Bytes>,
}

impl Response {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            binary: None,
        }
    }

    /// Whether the response carried neither lines nor binary data.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.binary.is_none()
    }
}

/// A protocol-level response unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseUnit {
    /// The daemon greeting with its protocol version.
    Greeting(Version),
    /// A successful response (one per command, or one per command-list member).
    Success(Response),
    /// An `ACK` failure.
    Failure(AckError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingGreeting,
    Active,
}

/// Turns a token sequence into response units.
pub struct ResponseGrouper {
    state: State,
    /// Inside a command list after at least one `list_OK`.
    in_list: bool,
    current: Response,
}

impl ResponseGrouper {
    pub fn new() -> Self {
        Self {
            state: State::AwaitingGreeting,
            in_list: false,
            current: Response::default(),
        }
    }

    /// Whether the greeting has been seen.
    pub fn is_active(&self) -> bool {
        self.state == State::Active
    }

    /// Feed one token, returning a unit once one is complete.
    ///
    /// # Errors
    ///
    /// Returns a framing error if the first token is not a greeting or a
    /// response carries more than one binary segment. Both are fatal.
    pub fn push(&mut self, token: Token) -> Result<Option<ResponseUnit>> {
        if self.state == State::AwaitingGreeting {
            return match token {
                Token::Line(line) => match parse_greeting(&line) {
                    Some(version) => {
                        self.state = State::Active;
                        Ok(Some(ResponseUnit::Greeting(version)))
                    }
                    None => Err(MpcError::Framing(format!(
                        "Unexpected initial message: {:?}",
                        line
                    ))),
                },
                Token::Binary(data) => Err(MpcError::Framing(format!(
                    "Unexpected binary segment of {} bytes before greeting",
                    data.len()
                ))),
            };
        }

        match token {
            Token::Line(line) if line == OK => {
                if self.in_list {
                    self.in_list = false;
                    Ok(None)
                } else {
                    Ok(Some(ResponseUnit::Success(self.take_current())))
                }
            }
            Token::Line(line) if line == LIST_OK => {
                self.in_list = true;
                Ok(Some(ResponseUnit::Success(self.take_current())))
            }
            Token::Line(line) if line.starts_with(ACK_PREFIX) => {
                self.in_list = false;
                self.current = Response::default();
                Ok(Some(ResponseUnit::Failure(parse_ack(&line))))
            }
            Token::Line(line) => {
                self.current.lines.push(line);
                Ok(None)
            }
            Token::Binary(data) => {
                if self.current.binary.is_some() {
                    return Err(MpcError::Framing(
                        "Second binary segment in one response".to_string(),
                    ));
                }
                self.current.binary = Some(data);
                Ok(None)
            }
        }
    }

    fn take_current(&mut self) -> Response {
        std::mem::take(&mut self.current)
    }
}

impl Default for ResponseGrouper {
    fn default() -> Self {
        Self::new()
    }
}
