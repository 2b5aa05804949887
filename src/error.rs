//! Error types for mpc-client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure reported by the daemon through an `ACK` line.
///
/// Only the failing command is affected; the session stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckError {
    /// Numeric error code (`-1` if the line could not be parsed).
    pub code: i32,
    /// Position of the failing command inside its command list.
    pub index: u32,
    /// The command the daemon was executing.
    pub command: String,
    /// Human readable message.
    pub message: String,
}

impl std::fmt::Display for AckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.command.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(f, "[{}] {{{}}} {}", self.code, self.command, self.message)
        }
    }
}

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum MpcError {
    /// I/O error on the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed bytes or an unexpected token (fatal).
    #[error("Framing error: {0}")]
    Framing(String),

    /// A response arrived that no request was waiting for (fatal).
    #[error("Protocol synchronization error: {0}")]
    ProtocolSync(String),

    /// The daemon rejected a command.
    #[error("Daemon error: {0}")]
    Ack(AckError),

    /// The session ended before the request was settled.
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// The session has not received the daemon greeting yet.
    #[error("Session is not ready")]
    NotReady,

    /// Command text that cannot be put on the wire.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// Unparseable daemon address.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,
}

impl MpcError {
    /// Whether this error ends the session.
    ///
    /// `Ack` and the `Invalid*` variants only concern a single call.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MpcError::Ack(_) | MpcError::InvalidCommand(_) | MpcError::InvalidEndpoint(_)
        )
    }

    /// The daemon error, if this is one.
    pub fn as_ack(&self) -> Option<&AckError> {
        match self {
            MpcError::Ack(ack) => Some(ack),
            _ => None,
        }
    }
}

impl From<AckError> for MpcError {
    fn from(err: AckError) -> Self {
        MpcError::Ack(err)
    }
}

/// Result type alias using MpcError.
pub type Result<T> = std::result::Result<T, MpcError>;
