//! Configuration, link state, and event/command enums for the connection manager.

use std::time::Duration;

use crate::protocol::{AudioReceivePayload, ChatReceivePayload, RelayFrame};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection and reconnect tuning.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
    /// Reconnect base delay.
    pub reconnect_delay: Duration,
    /// Maximum reconnect delay.
    pub max_reconnect_delay: Duration,
    /// Consecutive failed attempts before the relay is declared
    /// unreachable. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            max_reconnect_attempts: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Link state
// ---------------------------------------------------------------------------

/// State of the relay link. Written only by the connection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Joined,
}

impl LinkState {
    /// Whether the link may move from `self` to `next`. `Joined` is only
    /// reachable through `Connecting`; any state may drop to `Disconnected`.
    pub fn can_transition_to(self, next: LinkState) -> bool {
        matches!(
            (self, next),
            (LinkState::Disconnected, LinkState::Connecting)
                | (LinkState::Connecting, LinkState::Joined)
                | (_, LinkState::Disconnected)
        )
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events delivered to subscribers.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// Link established and room joined.
    Connected,
    /// Link lost; the loop is already working on a reconnect.
    Disconnected,
    /// Reconnect attempts exhausted. Terminal.
    Unreachable,
    ChatReceived(ChatReceivePayload),
    AudioReceived(AudioReceivePayload),
}

/// Subscription key for [`RelayEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    Unreachable,
    ChatReceived,
    AudioReceived,
}

impl RelayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RelayEvent::Connected => EventKind::Connected,
            RelayEvent::Disconnected => EventKind::Disconnected,
            RelayEvent::Unreachable => EventKind::Unreachable,
            RelayEvent::ChatReceived(_) => EventKind::ChatReceived,
            RelayEvent::AudioReceived(_) => EventKind::AudioReceived,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands sent to the connection loop from the handle.
#[derive(Debug)]
pub(crate) enum ConnectionCommand {
    Connect,
    Send(RelayFrame),
    Shutdown,
}
