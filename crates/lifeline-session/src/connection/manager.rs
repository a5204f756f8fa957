//! Public handle for the relay connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::protocol::RelayFrame;
use crate::token::RoomToken;
use crate::transport::Connector;

use super::link_loop::{connection_loop, join_frame, LoopContext};
use super::registry::{EventHandler, SubscriberRegistry, SubscriptionId};
use super::types::{ConnectionCommand, ConnectionConfig, EventKind, LinkState, RelayEvent};

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Handle for the relay connection of one room.
///
/// All methods are non-blocking and send commands to the background
/// connection task. Clones share the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    token: RoomToken,
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    state_rx: watch::Receiver<LinkState>,
    registry: Arc<SubscriberRegistry>,
    unreachable: Arc<AtomicBool>,
}

impl ConnectionManager {
    /// Spawn the connection task. It stays idle until [`connect`](Self::connect).
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(token: RoomToken, config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);
        let registry = Arc::new(SubscriberRegistry::default());
        let unreachable = Arc::new(AtomicBool::new(false));

        let ctx = LoopContext {
            token: token.clone(),
            config,
            connector,
            state_tx,
            registry: Arc::clone(&registry),
            unreachable: Arc::clone(&unreachable),
        };
        tokio::spawn(connection_loop(ctx, command_rx));

        Self {
            token,
            command_tx,
            state_rx,
            registry,
            unreachable,
        }
    }

    pub fn room_token(&self) -> &RoomToken {
        &self.token
    }

    pub fn link_state(&self) -> LinkState {
        *self.state_rx.borrow()
    }

    /// A receiver that observes every link state change.
    pub fn watch_link_state(&self) -> watch::Receiver<LinkState> {
        self.state_rx.clone()
    }

    pub fn is_joined(&self) -> bool {
        self.link_state() == LinkState::Joined
    }

    /// True once bounded reconnects have been exhausted.
    pub fn is_unreachable(&self) -> bool {
        self.unreachable.load(Ordering::SeqCst)
    }

    /// Start connecting. No-op unless the link is disconnected, and after
    /// the relay has been declared unreachable.
    pub fn connect(&self) {
        if self.is_unreachable() {
            debug!("Relay unreachable, ignoring connect");
            return;
        }
        if self.link_state() != LinkState::Disconnected {
            return;
        }
        let _ = self.command_tx.send(ConnectionCommand::Connect);
    }

    /// Queue a frame for the relay. Dropped unless joined.
    ///
    /// Returns whether the frame was handed to the connection task; that
    /// says nothing about delivery.
    pub fn send(&self, frame: RelayFrame) -> bool {
        if !self.is_joined() {
            debug!(event = %frame.event, state = ?self.link_state(), "Not joined, dropping frame");
            return false;
        }
        self.command_tx.send(ConnectionCommand::Send(frame)).is_ok()
    }

    /// Serialize a payload and [`send`](Self::send) it.
    pub fn send_payload<T: Serialize>(&self, event: &str, payload: &T) -> bool {
        match RelayFrame::from_payload(event, payload) {
            Ok(frame) => self.send(frame),
            Err(e) => {
                warn!(error = %e, event = %event, "Failed to encode payload");
                false
            }
        }
    }

    /// Re-assert room membership.
    pub fn announce(&self) -> bool {
        match join_frame(&self.token) {
            Some(frame) => self.send(frame),
            None => false,
        }
    }

    /// Register a handler for one event kind. Handlers persist across
    /// reconnects until unsubscribed.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&RelayEvent) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        self.registry.subscribe(kind, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Close the link and stop the connection task.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }
}
