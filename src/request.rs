//! Requests owned by the scheduler and the handles callers await.
//!
//! A [`Request`] is settled by value: [`Request::settle`] consumes it, so a
//! request can never be settled twice.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{MpcError, Result};
use crate::protocol::{Response, IDLE};

/// Who receives the outcome of a request.
#[derive(Debug)]
enum Settle {
    /// A caller awaiting a [`ResponseHandle`].
    Caller(oneshot::Sender<Result<Response>>),
    /// The synthetic idle subscription; the scheduler handles its outcome.
    Idle,
}

/// A command waiting for (or being processed by) the daemon.
#[derive(Debug)]
pub struct Request {
    command: String,
    settle: Settle,
}

impl Request {
    /// Create a caller request and the handle that will receive its outcome.
    pub fn new(command: impl Into<String>) -> (Self, ResponseHandle) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            command: command.into(),
            settle: Settle::Caller(tx),
        };
        (request, ResponseHandle { rx })
    }

    /// The synthetic idle subscription request.
    pub(crate) fn idle() -> Self {
        Self {
            command: IDLE.to_string(),
            settle: Settle::Idle,
        }
    }

    /// The command line (without `\n`).
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether this is the synthetic idle subscription.
    pub fn is_idle(&self) -> bool {
        matches!(self.settle, Settle::Idle)
    }

    /// Deliver the outcome. Consumes the request.
    ///
    /// A caller that dropped its handle is silently skipped.
    pub fn settle(self, outcome: Result<Response>) {
        if let Settle::Caller(tx) = self.settle {
            if tx.send(outcome).is_err() {
                tracing::debug!("Response for {:?} discarded, handle dropped", self.command);
            }
        }
    }
}

/// Future resolving to the outcome of a submitted command.
///
/// Dropping the handle does not cancel the command: the daemon still
/// answers it, and the answer is discarded so correlation stays intact.
#[derive(Debug)]
pub struct ResponseHandle {
    rx: oneshot::Receiver<Result<Response>>,
}

impl Future for ResponseHandle {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|outcome| {
            outcome.unwrap_or_else(|_| {
                Err(MpcError::Disconnected(
                    "Session ended before the request was settled".to_string(),
                ))
            })
        })
    }
}
