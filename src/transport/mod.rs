//! Transport module - byte channels to the daemon.
//!
//! The protocol engine only needs a bidirectional byte stream: anything
//! implementing `AsyncRead + AsyncWrite + Send + 'static` can be
//! handed to [`Client::connect`](crate::Client::connect). This module
//! provides the usual ones:
//! - TCP (default `localhost:6600`)
//! - Unix Domain Sockets (Unix only)

mod endpoint;
mod socket;

pub use endpoint::{Endpoint, DEFAULT_HOST, DEFAULT_PORT};
pub use socket::{connect, connect_tcp, Connection};

#[cfg(unix)]
pub use socket::connect_unix;
