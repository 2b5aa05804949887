//! Session notifications.
//!
//! Each session owns one broadcast channel. Subscribers receive:
//! - [`Event::Ready`] once the greeting arrived
//! - [`Event::Changed`] with every subsystem named by an idle response
//! - [`Event::SubsystemChanged`] once per subsystem in that response
//! - [`Event::Disconnected`] exactly once, when the session ends

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default broadcast buffer size.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Broadcast event stream type used by subscribers.
pub type EventStream = broadcast::Receiver<Event>;

/// A notification emitted by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The daemon greeted us; commands can be sent.
    Ready { version: crate::protocol::Version },
    /// An idle subscription reported changes.
    Changed { subsystems: Vec<String> },
    /// One subsystem changed.
    SubsystemChanged { subsystem: String },
    /// The session ended. Terminal.
    Disconnected { reason: String },
}

impl Event {
    /// Whether this event concerns `subsystem`.
    pub fn concerns(&self, subsystem: &str) -> bool {
        match self {
            Event::Changed { subsystems } => subsystems.iter().any(|s| s == subsystem),
            Event::SubsystemChanged { subsystem: s } => s == subsystem,
            _ => false,
        }
    }
}

/// Sending half of a session's notification channel.
#[derive(Clone, Debug)]
pub struct EventChannel {
    tx: broadcast::Sender<Event>,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to emitted events.
    pub fn subscribe(&self) -> EventStream {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Emission is best-effort; having no subscribers is not an error.
    pub fn emit(&self, event: Event) {
        tracing::debug!(?event, "emit");
        let _ = self.tx.send(event);
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
