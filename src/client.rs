//! Client builder and session loop.
//!
//! [`ClientBuilder::connect`] splits the transport and spawns two tasks:
//! 1. Writer task: the only writer of the transport (see [`writer`](crate::writer))
//! 2. Session task: the only reader; owns the decoder, the grouper and the
//!    [`Scheduler`]
//!
//! Callers talk to the session task through an unbounded channel, so
//! [`Client::submit`] never blocks.
//!
//! # Example
//!
//! ```ignore
//! use mpc_client::{Client, Event};
//!
//! #[tokio::main]
//! async fn main() -> mpc_client::Result<()> {
//!     let client = Client::builder()
//!         .read_buffer_size(16 * 1024)
//!         .connect_endpoint(&"localhost:6600".parse()?)
//!         .await?;
//!
//!     let mut events = client.subscribe();
//!     let status = client.send_command("status").await?;
//!     println!("{:?}", status.record().get("state"));
//!
//!     while let Ok(event) = events.recv().await {
//!         if let Event::Disconnected { .. } = event {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::sync::{mpsc, oneshot};

use crate::error::{MpcError, Result};
use crate::events::{Event, EventChannel, EventStream, DEFAULT_EVENT_CAPACITY};
use crate::protocol::{LineDecoder, Response, ResponseGrouper, Version, DEFAULT_MAX_BINARY_SIZE};
use crate::request::{Request, ResponseHandle};
use crate::scheduler::Scheduler;
use crate::transport::{self, Endpoint};
use crate::writer::{spawn_writer_task, WriterHandle, DEFAULT_CHANNEL_CAPACITY};

/// Default read buffer size (64 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Session tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bytes requested from the transport per read.
    pub read_buffer_size: usize,
    /// Capacity of the writer task's queue.
    pub channel_capacity: usize,
    /// Events buffered per subscriber before it lags.
    pub event_capacity: usize,
    /// Largest accepted `binary: N` segment.
    pub max_binary_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_binary_size: DEFAULT_MAX_BINARY_SIZE,
        }
    }
}

/// Builder for configuring and connecting a client.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the read buffer size.
    ///
    /// Default: 64 KiB
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the writer channel capacity.
    ///
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Set the event buffer of each subscriber.
    ///
    /// Default: 256
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Set the largest accepted binary segment.
    ///
    /// Default: 64 MiB
    pub fn max_binary_size(mut self, size: usize) -> Self {
        self.config.max_binary_size = size;
        self
    }

    /// Open a connection to `endpoint` and start a session on it.
    pub async fn connect_endpoint(self, endpoint: &Endpoint) -> Result<Client> {
        let conn = transport::connect(endpoint).await?;
        tracing::debug!(%endpoint, peer = %conn.peer(), "Connected");
        self.connect(conn).await
    }

    /// Start a session on an already connected transport.
    ///
    /// Resolves once the daemon greeting has been received.
    ///
    /// # Errors
    ///
    /// Fails if the first line is not a greeting or the transport closes
    /// before it arrives.
    pub async fn connect<T>(self, io: T) -> Result<Client>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let config = self.config;
        let (reader, write_half) = tokio::io::split(io);
        let (writer, writer_task) = spawn_writer_task(write_half, config.channel_capacity);

        let events = EventChannel::new(config.event_capacity);
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let session = Session {
            reader,
            decoder: LineDecoder::with_max_binary(config.max_binary_size),
            grouper: ResponseGrouper::new(),
            scheduler: Scheduler::new(),
            writer,
            events: events.clone(),
            ready: Some(ready_tx),
        };

        tokio::spawn(async move {
            let ack = session.run(commands_rx, config.read_buffer_size).await;

            // the session held the last writer handle
            match writer_task.await {
                Ok(Err(e)) => tracing::debug!("Writer ended with error: {}", e),
                Err(e) => tracing::error!("Writer task failed: {}", e),
                Ok(Ok(())) => {}
            }

            if let Some(ack) = ack {
                let _ = ack.send(());
            }
        });

        let version = match ready_rx.await {
            Ok(Ok(version)) => version,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(MpcError::ConnectionClosed),
        };

        Ok(Client {
            commands,
            events,
            version,
        })
    }
}

enum SessionCommand {
    Submit(Request),
    Disconnect(oneshot::Sender<()>),
}

/// A connected session.
///
/// Dropping the client closes the session; requests still outstanding
/// resolve with [`MpcError::Disconnected`].
#[derive(Debug)]
pub struct Client {
    commands: mpsc::UnboundedSender<SessionCommand>,
    events: EventChannel,
    version: Version,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Start a session on `io` with the default configuration.
    pub async fn connect<T>(io: T) -> Result<Self>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        ClientBuilder::new().connect(io).await
    }

    /// Protocol version announced by the daemon greeting.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Queue a command and return a handle to its outcome.
    ///
    /// Never waits. The handle resolves with the response, the daemon's
    /// [`MpcError::Ack`], or [`MpcError::Disconnected`].
    ///
    /// # Errors
    ///
    /// Fails if the command contains a line feed or the session has ended.
    pub fn submit(&self, command: impl Into<String>) -> Result<ResponseHandle> {
        let command = command.into();
        if command.contains('\n') {
            return Err(MpcError::InvalidCommand(format!(
                "{:?} contains a line feed",
                command
            )));
        }

        let (request, handle) = Request::new(command);
        self.commands
            .send(SessionCommand::Submit(request))
            .map_err(|_| MpcError::Disconnected("Session closed".to_string()))?;
        Ok(handle)
    }

    /// Send a command and wait for its response.
    pub async fn send_command(&self, command: impl Into<String>) -> Result<Response> {
        self.submit(command)?.await
    }

    /// Round trip a `ping`.
    pub async fn ping(&self) -> Result<()> {
        self.send_command("ping").await.map(|_| ())
    }

    /// Subscribe to session events.
    ///
    /// [`Event::Ready`] has already been emitted when the client is returned.
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Whether the session task is still running.
    pub fn is_connected(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Close the session.
    ///
    /// Outstanding requests resolve with [`MpcError::Disconnected`] and
    /// [`Event::Disconnected`] is emitted. Returns once the transport's write
    /// side has been shut down.
    pub async fn disconnect(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(SessionCommand::Disconnect(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Wait until the session ends for any reason.
    pub async fn closed(&self) {
        self.commands.closed().await
    }
}

/// Result of one wait in the session loop.
enum Step {
    Command(Option<SessionCommand>),
    Read(std::io::Result<usize>),
}

/// State owned by the session task.
struct Session<R> {
    reader: R,
    decoder: LineDecoder,
    grouper: ResponseGrouper,
    scheduler: Scheduler,
    writer: WriterHandle,
    events: EventChannel,
    /// Fired with the greeting version, or the error that came first.
    ready: Option<oneshot::Sender<Result<Version>>>,
}

impl<R: AsyncRead + Unpin> Session<R> {
    /// Run until the transport fails or the client goes away.
    ///
    /// Returns the acknowledgement channel of an explicit disconnect.
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        read_buffer_size: usize,
    ) -> Option<oneshot::Sender<()>> {
        let mut buf = vec![0u8; read_buffer_size.max(1)];

        loop {
            // pending submissions first, so they join the next batch
            let step = tokio::select! {
                biased;
                command = commands.recv() => Step::Command(command),
                read = self.reader.read(&mut buf) => Step::Read(read),
            };

            let result = match step {
                Step::Command(Some(SessionCommand::Submit(request))) => {
                    // a rejected request has already been settled
                    if let Err(e) = self.scheduler.submit(request) {
                        tracing::debug!("Submit rejected: {}", e);
                    }
                    Ok(())
                }
                Step::Command(Some(SessionCommand::Disconnect(ack))) => {
                    self.close("Disconnected by client").await;
                    return Some(ack);
                }
                Step::Command(None) => {
                    self.close("Client dropped").await;
                    return None;
                }
                Step::Read(Ok(0)) => Err(MpcError::ConnectionClosed),
                Step::Read(Ok(n)) => self.on_bytes(&buf[..n]),
                Step::Read(Err(e)) => Err(MpcError::Io(e)),
            };

            let result = match result {
                Ok(()) => self.flush().await,
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                self.fail(e).await;
                return None;
            }
        }
    }

    fn on_bytes(&mut self, data: &[u8]) -> Result<()> {
        tracing::trace!(bytes = data.len(), "read");
        for token in self.decoder.push(data)? {
            if let Some(unit) = self.grouper.push(token)? {
                self.scheduler.on_unit(unit)?;
            }
        }
        // complete tokens ahead of a framing error are handled first
        match self.decoder.take_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Hand pending notifications to subscribers and pending bytes to the
    /// writer.
    async fn flush(&mut self) -> Result<()> {
        for event in self.scheduler.take_notifications() {
            if let Event::Ready { version } = &event {
                if let Some(ready) = self.ready.take() {
                    let _ = ready.send(Ok(*version));
                }
            }
            self.events.emit(event);
        }

        for bytes in self.scheduler.take_outbound() {
            tracing::debug!(command = %String::from_utf8_lossy(&bytes).trim_end(), "send");
            self.writer.send(bytes).await?;
        }
        Ok(())
    }

    async fn close(&mut self, reason: &str) {
        self.scheduler.close(reason);
        // nothing is left to write once closed
        let _ = self.flush().await;
    }

    async fn fail(&mut self, err: MpcError) {
        tracing::error!("Session failed: {}", err);
        self.close(&err.to_string()).await;
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Err(err));
        }
    }
}
