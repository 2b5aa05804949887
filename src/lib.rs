//! # mpc-client
//!
//! Async client engine for the line-oriented protocol of a music player
//! daemon.
//!
//! The client keeps one connection, pipelines commands in command lists and
//! parks on `idle` in between, turning idle responses into [`Event`]s.
//!
//! ## Architecture
//!
//! - **Decoding**: [`protocol::LineDecoder`] turns bytes into lines and
//!   binary segments, [`protocol::ResponseGrouper`] turns those into
//!   response units
//! - **Scheduling**: [`Scheduler`] correlates units with requests in FIFO
//!   order and toggles idle; it performs no I/O
//! - **Session**: [`Client`] runs the above in a tokio task that is the only
//!   reader of the transport, next to a writer task that is the only writer
//!
//! ## Example
//!
//! ```ignore
//! use mpc_client::{Client, Command};
//!
//! #[tokio::main]
//! async fn main() -> mpc_client::Result<()> {
//!     let stream = tokio::net::TcpStream::connect("localhost:6600").await?;
//!     let client = Client::connect(stream).await?;
//!
//!     let a = client.submit("status")?;
//!     let b = client.submit(Command::new("find").arg("Artist").arg("Miles Davis"))?;
//!
//!     println!("{:?}", a.await?.record());
//!     println!("{} songs", b.await?.records(&["file"]).len());
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod events;
pub mod protocol;
pub mod request;
pub mod scheduler;
pub mod transport;

mod client;
mod writer;

pub use client::{Client, ClientBuilder, ClientConfig, DEFAULT_READ_BUFFER_SIZE};
pub use codec::Record;
pub use command::Command;
pub use error::{AckError, MpcError, Result};
pub use events::{Event, EventStream};
pub use protocol::{Response, Version};
pub use request::{Request, ResponseHandle};
pub use scheduler::{Scheduler, SessionState};
pub use transport::Endpoint;
