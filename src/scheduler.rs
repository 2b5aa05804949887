//! Request scheduler - correlation of commands with responses.
//!
//! The scheduler is a pure state machine: it never touches the transport.
//! Bytes it wants written are queued and drained with
//! [`Scheduler::take_outbound`], notifications with
//! [`Scheduler::take_notifications`]. The session loop in
//! [`client`](crate::client) drives it.
//!
//! # States
//!
//! ```text
//! NotConnected <── close() ── any state
//! AwaitingGreeting ── Greeting ──> dispatch()
//! Idle        (synthetic `idle` in flight, queue empty)
//! Dispatched  (a caller batch, or an interrupted idle, in flight)
//! ```
//!
//! `dispatch()` runs whenever the in-flight list drains: it moves the whole
//! queue in flight as one batch, or subscribes to idle if the queue is
//! empty. Nothing is written while a response is still owed, so responses
//! are correlated strictly in FIFO order.

use std::collections::VecDeque;

use bytes::Bytes;

use crate::error::{AckError, MpcError, Result};
use crate::events::Event;
use crate::protocol::{
    encode_batch, encode_line, parse_changed, Response, ResponseUnit, Version, IDLE, NOIDLE,
};
use crate::request::Request;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Closed; a new session is required.
    NotConnected,
    /// Connected, greeting not yet received.
    AwaitingGreeting,
    /// Only the idle subscription is in flight.
    Idle,
    /// A batch is in flight.
    Dispatched,
}

/// Owns the request queue, the in-flight list and the idle toggle.
#[derive(Debug)]
pub struct Scheduler {
    state: SessionState,
    version: Option<Version>,
    /// Submitted but not yet sent.
    queued: VecDeque<Request>,
    /// Sent, in the order their responses will arrive.
    in_flight: VecDeque<Request>,
    outbound: Vec<Bytes>,
    notifications: Vec<Event>,
}

impl Scheduler {
    /// Create the scheduler of a freshly opened connection.
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingGreeting,
            version: None,
            queued: VecDeque::new(),
            in_flight: VecDeque::new(),
            outbound: Vec::new(),
            notifications: Vec::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Protocol version from the greeting.
    #[inline]
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    /// Whether the greeting was received and the session is open.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Idle | SessionState::Dispatched)
    }

    /// Whether the idle subscription is in flight and not yet interrupted.
    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Queue a request.
    ///
    /// If the idle subscription is in flight it is interrupted with `noidle`;
    /// the batch goes out once the daemon has answered the idle.
    ///
    /// # Errors
    ///
    /// Fails (and settles the request with the same error) if the session is
    /// not ready or the command text contains a line feed.
    pub fn submit(&mut self, request: Request) -> Result<()> {
        if request.command().contains('\n') {
            let reason = format!("{:?} contains a line feed", request.command());
            request.settle(Err(MpcError::InvalidCommand(reason.clone())));
            return Err(MpcError::InvalidCommand(reason));
        }

        match self.state {
            SessionState::NotConnected => {
                request.settle(Err(MpcError::Disconnected("Not connected".to_string())));
                return Err(MpcError::Disconnected("Not connected".to_string()));
            }
            SessionState::AwaitingGreeting => {
                request.settle(Err(MpcError::NotReady));
                return Err(MpcError::NotReady);
            }
            SessionState::Idle | SessionState::Dispatched => {}
        }

        tracing::trace!(command = request.command(), "queued");
        self.queued.push_back(request);

        if self.state == SessionState::Idle {
            tracing::debug!("Interrupting idle");
            self.outbound.push(encode_line(NOIDLE));
            self.state = SessionState::Dispatched;
        }

        Ok(())
    }

    /// Process one response unit.
    ///
    /// # Errors
    ///
    /// A unit nobody is waiting for (or a second greeting) is a protocol
    /// synchronization error; the session is closed before returning it.
    pub fn on_unit(&mut self, unit: ResponseUnit) -> Result<()> {
        let result = match unit {
            ResponseUnit::Greeting(version) => self.on_greeting(version),
            ResponseUnit::Success(response) => self.on_success(response),
            ResponseUnit::Failure(ack) => self.on_failure(ack),
        };

        if let Err(e) = &result {
            self.close(&e.to_string());
        }
        result
    }

    fn on_greeting(&mut self, version: Version) -> Result<()> {
        if self.state != SessionState::AwaitingGreeting {
            return Err(MpcError::ProtocolSync(format!(
                "Unexpected greeting (version {}) in state {:?}",
                version, self.state
            )));
        }

        tracing::debug!(%version, "Daemon ready");
        self.version = Some(version);
        self.notifications.push(Event::Ready { version });
        self.dispatch();
        Ok(())
    }

    fn on_success(&mut self, response: Response) -> Result<()> {
        let request = self.in_flight.pop_front().ok_or_else(|| {
            MpcError::ProtocolSync(format!(
                "Received unexpected response:\n{}",
                response.lines.join("\n")
            ))
        })?;

        if request.is_idle() {
            self.on_idle_response(&response);
        }
        request.settle(Ok(response));

        if self.in_flight.is_empty() {
            self.dispatch();
        }
        Ok(())
    }

    fn on_failure(&mut self, ack: AckError) -> Result<()> {
        let request = self.in_flight.pop_front().ok_or_else(|| {
            MpcError::ProtocolSync(format!("Received unexpected error: {}", ack))
        })?;

        if request.is_idle() {
            tracing::warn!(%ack, "Idle subscription failed");
        } else {
            tracing::debug!(command = request.command(), %ack, "Command failed");
        }
        request.settle(Err(MpcError::Ack(ack)));

        // the daemon abandoned the rest of the list; retry it as a new batch
        if !self.in_flight.is_empty() {
            tracing::debug!(count = self.in_flight.len(), "Requeueing abandoned commands");
        }
        while let Some(request) = self.in_flight.pop_back() {
            self.queued.push_front(request);
        }

        self.dispatch();
        Ok(())
    }

    fn on_idle_response(&mut self, response: &Response) {
        let subsystems: Vec<String> = response
            .lines
            .iter()
            .filter_map(|line| parse_changed(line))
            .map(str::to_string)
            .collect();

        if subsystems.is_empty() {
            return;
        }

        self.notifications.push(Event::Changed {
            subsystems: subsystems.clone(),
        });
        self.notifications
            .extend(subsystems.into_iter().map(|subsystem| Event::SubsystemChanged { subsystem }));
    }

    fn dispatch(&mut self) {
        debug_assert!(self.in_flight.is_empty());

        if self.queued.is_empty() {
            self.in_flight.push_back(Request::idle());
            self.state = SessionState::Idle;
            self.outbound.push(encode_line(IDLE));
            return;
        }

        self.in_flight = std::mem::take(&mut self.queued);
        self.state = SessionState::Dispatched;

        let commands: Vec<&str> = self.in_flight.iter().map(Request::command).collect();
        tracing::debug!(?commands, "Dispatching batch");
        self.outbound.push(encode_batch(&commands));
    }

    /// Close the session, settling every outstanding request with a
    /// disconnect error and emitting [`Event::Disconnected`].
    ///
    /// Calling it on a closed session does nothing.
    pub fn close(&mut self, reason: &str) {
        if self.state == SessionState::NotConnected {
            return;
        }

        tracing::debug!(
            reason,
            in_flight = self.in_flight.len(),
            queued = self.queued.len(),
            "Closing session"
        );

        for request in self.in_flight.drain(..).chain(self.queued.drain(..)) {
            request.settle(Err(MpcError::Disconnected(reason.to_string())));
        }

        self.state = SessionState::NotConnected;
        self.version = None;
        self.outbound.clear();
        self.notifications.push(Event::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Drain the bytes waiting to be written, in order.
    pub fn take_outbound(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.outbound)
    }

    /// Drain pending notifications, in order.
    pub fn take_notifications(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.notifications)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
