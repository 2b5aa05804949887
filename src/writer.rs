//! Dedicated writer task for outbound command bytes.
//!
//! The session loop is the only producer; it hands encoded lines and
//! batches to the writer task through an mpsc channel, which keeps them in
//! order and lets several ready buffers (e.g. `noidle` followed by nothing
//! else yet) go out with a single flush.
//!
//! # Architecture
//!
//! ```text
//! Session loop ─► mpsc::Sender<Bytes> ─► Writer Task ─► Transport
//! ```

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{MpcError, Result};

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum buffers to coalesce into a single write.
const MAX_BATCH_SIZE: usize = 64;

/// Handle for sending bytes to the writer task.
#[derive(Clone, Debug)]
pub struct WriterHandle {
    tx: mpsc::Sender<Bytes>,
}

impl WriterHandle {
    /// Send bytes to the writer task.
    ///
    /// Waits while the channel is full.
    pub async fn send(&self, bytes: Bytes) -> Result<()> {
        self.tx
            .send(bytes)
            .await
            .map_err(|_| MpcError::ConnectionClosed)
    }

    /// Whether the writer task has stopped.
    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task and return a handle for sending bytes.
///
/// The task ends cleanly when every handle is dropped, after shutting the
/// transport's write side down.
pub fn spawn_writer_task<W>(writer: W, channel_capacity: usize) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Main writer loop - receives buffers and writes them to the transport.
async fn writer_loop<W>(mut rx: mpsc::Receiver<Bytes>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let first = match rx.recv().await {
            Some(bytes) => bytes,
            None => {
                // channel closed, clean shutdown
                let _ = writer.shutdown().await;
                return Ok(());
            }
        };

        let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);
        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(bytes) => batch.push(bytes),
                Err(_) => break,
            }
        }

        if let Err(e) = write_batch(&mut writer, &batch).await {
            tracing::error!("Write failed: {}", e);
            return Err(e);
        }
    }
}

/// Write a batch of buffers followed by one flush.
async fn write_batch<W>(writer: &mut W, batch: &[Bytes]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match batch {
        [] => return Ok(()),
        [single] => writer.write_all(single).await?,
        _ => {
            let total: usize = batch.iter().map(Bytes::len).sum();
            let mut joined = BytesMut::with_capacity(total);
            for bytes in batch {
                joined.extend_from_slice(bytes);
            }
            writer.write_all(&joined).await?;
        }
    }

    tracing::trace!(buffers = batch.len(), "flushed");
    writer.flush().await?;
    Ok(())
}
