//! Socket transports.
//!
//! - TCP: any platform
//! - Unix Domain Socket: Unix only
//!
//! # Example
//!
//! ```ignore
//! use mpc_client::transport::{connect, Endpoint};
//!
//! let stream = connect(&Endpoint::from_env()?).await?;
//! let client = mpc_client::Client::connect(stream).await?;
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

use super::Endpoint;
use crate::error::Result;

/// A connected socket to the daemon.
#[derive(Debug)]
pub enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

/// Open a TCP connection.
pub async fn connect_tcp(host: &str, port: u16) -> Result<Connection> {
    tracing::debug!(host, port, "Connecting over TCP");
    let stream = TcpStream::connect((host, port)).await?;
    stream.set_nodelay(true)?;
    Ok(Connection::Tcp(stream))
}

/// Open a Unix Domain Socket connection.
#[cfg(unix)]
pub async fn connect_unix(path: impl AsRef<std::path::Path>) -> Result<Connection> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "Connecting over Unix socket");
    let stream = UnixStream::connect(path).await?;
    Ok(Connection::Unix(stream))
}

/// Open a connection to `endpoint`.
pub async fn connect(endpoint: &Endpoint) -> Result<Connection> {
    match endpoint {
        Endpoint::Tcp { host, port } => connect_tcp(host, *port).await,
        #[cfg(unix)]
        Endpoint::Unix(path) => connect_unix(path).await,
        #[cfg(not(unix))]
        Endpoint::Unix(path) => Err(crate::error::MpcError::InvalidEndpoint(format!(
            "Unix sockets are not supported on this platform: {}",
            path.display()
        ))),
    }
}

impl Connection {
    /// The peer address, for logging.
    pub fn peer(&self) -> String {
        match self {
            Connection::Tcp(stream) => stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "tcp".to_string()),
            #[cfg(unix)]
            Connection::Unix(stream) => stream
                .peer_addr()
                .ok()
                .and_then(|a| a.as_pathname().map(|p| p.display().to_string()))
                .unwrap_or_else(|| "unix".to_string()),
        }
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Connection::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            Connection::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
