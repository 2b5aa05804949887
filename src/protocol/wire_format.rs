//! Wire format constants, line parsing and batch encoding.
//!
//! The protocol is line oriented:
//! ```text
//! greeting      OK MPD 0.23.5\n                          (first line only)
//! success       ...content lines...\nOK\n
//! list member   ...content lines...\nlist_OK\n
//! failure       ACK [50@1] {play} No such song\n
//! binary        binary: 5\nHELLO\n                       (inside a response)
//! ```
//!
//! Client batches use `command_list_ok_begin` / `command_list_end`.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::AckError;

/// Success terminator line.
pub const OK: &str = "OK";

/// Terminator of one command-list member.
pub const LIST_OK: &str = "list_OK";

/// Prefix of a failure line.
pub const ACK_PREFIX: &str = "ACK [";

/// Prefix announcing a binary segment.
pub const BINARY_PREFIX: &str = "binary: ";

/// Prefix of an idle notification line.
pub const CHANGED_PREFIX: &str = "changed: ";

/// Idle subscription command.
pub const IDLE: &str = "idle";

/// Idle cancellation command.
pub const NOIDLE: &str = "noidle";

/// Opens a command list whose members are each terminated by `list_OK`.
pub const COMMAND_LIST_OK_BEGIN: &str = "command_list_ok_begin";

/// Closes a command list.
pub const COMMAND_LIST_END: &str = "command_list_end";

/// Line delimiter.
pub const LF: u8 = b'\n';

/// Protocol version announced by the daemon greeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The version as `[major, minor, patch]`.
    pub fn as_triple(&self) -> [u32; 3] {
        [self.major, self.minor, self.patch]
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parse the greeting line `OK <ident> <major>.<minor>.<patch>`.
///
/// Anything after the digits of the patch number (a fourth component,
/// trailing words) is ignored. Returns `None` if the line does not match.
pub fn parse_greeting(line: &str) -> Option<Version> {
    let rest = line.strip_prefix("OK ")?;
    let (ident, version) = rest.split_once(' ')?;
    if ident.is_empty() {
        return None;
    }

    let mut parts = version.trim_end().splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = leading_digits(parts.next()?).parse().ok()?;

    Some(Version::new(major, minor, patch))
}

fn leading_digits(s: &str) -> &str {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    &s[..end]
}

/// Parse a failure line `ACK [<code>@<index>] {<command>} <message>`.
///
/// A line starting with `ACK [` that does not follow the pattern yields
/// code `-1` and the whole line in the message.
pub fn parse_ack(line: &str) -> AckError {
    try_parse_ack(line).unwrap_or_else(|| AckError {
        code: -1,
        index: 0,
        command: String::new(),
        message: format!("Unknown error: {}", line),
    })
}

fn try_parse_ack(line: &str) -> Option<AckError> {
    let rest = line.strip_prefix(ACK_PREFIX)?;
    let (position, rest) = rest.split_once("] ")?;
    let (code, index) = position.split_once('@')?;
    let rest = rest.strip_prefix('{')?;
    let (command, message) = rest.split_once('}')?;

    Some(AckError {
        code: code.parse().ok()?,
        index: index.parse().ok()?,
        command: command.to_string(),
        message: message.strip_prefix(' ').unwrap_or(message).to_string(),
    })
}

/// Parse the announced length of a `binary: <N>` line.
///
/// Returns `None` if the line is not a binary announcement,
/// `Some(Err(line))` if the length is not a decimal number.
pub fn parse_binary_length(line: &str) -> Option<std::result::Result<usize, &str>> {
    let len = line.strip_prefix(BINARY_PREFIX)?;
    Some(len.trim().parse().map_err(|_| line))
}

/// Subsystem name from an idle line `changed: <subsystem>`.
pub fn parse_changed(line: &str) -> Option<&str> {
    line.strip_prefix(CHANGED_PREFIX)
}

/// Encode the wire form of a batch.
///
/// A single command is sent as one line; several are wrapped in a
/// `command_list_ok_begin` / `command_list_end` list.
pub fn encode_batch<S: AsRef<str>>(commands: &[S]) -> Bytes {
    let body: usize = commands.iter().map(|c| c.as_ref().len() + 1).sum();

    if commands.len() == 1 {
        let mut buf = BytesMut::with_capacity(body);
        put_line(&mut buf, commands[0].as_ref());
        return buf.freeze();
    }

    let mut buf = BytesMut::with_capacity(
        body + COMMAND_LIST_OK_BEGIN.len() + COMMAND_LIST_END.len() + 2,
    );
    put_line(&mut buf, COMMAND_LIST_OK_BEGIN);
    for command in commands {
        put_line(&mut buf, command.as_ref());
    }
    put_line(&mut buf, COMMAND_LIST_END);
    buf.freeze()
}

/// Encode a single line.
pub fn encode_line(line: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(line.len() + 1);
    put_line(&mut buf, line);
    buf.freeze()
}

fn put_line(buf: &mut BytesMut, line: &str) {
    buf.put_slice(line.as_bytes());
    buf.put_u8(LF);
}
