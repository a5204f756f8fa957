//! Background relay connection loop with auto-reconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::protocol::{events, JoinRoomPayload, RelayFrame};
use crate::token::RoomToken;
use crate::transport::{Connector, RelayLink, TransportError};

use super::handler::translate_frame;
use super::registry::SubscriberRegistry;
use super::types::{ConnectionCommand, ConnectionConfig, LinkState, RelayEvent};

/// Everything the loop owns besides the command receiver.
pub(crate) struct LoopContext {
    pub(crate) token: RoomToken,
    pub(crate) config: ConnectionConfig,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) state_tx: watch::Sender<LinkState>,
    pub(crate) registry: Arc<SubscriberRegistry>,
    pub(crate) unreachable: Arc<AtomicBool>,
}

impl LoopContext {
    fn set_state(&self, state: LinkState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug_assert!(
                current.can_transition_to(state),
                "illegal link transition {:?} -> {state:?}",
                *current
            );
            debug!(from = ?*current, to = ?state, "Link state");
            *current = state;
            true
        });
    }

    fn dispatch(&self, event: RelayEvent) {
        self.registry.dispatch(&event);
    }
}

/// Build the membership announcement for a room.
pub(crate) fn join_frame(token: &RoomToken) -> Option<RelayFrame> {
    let payload = JoinRoomPayload {
        room_token: token.as_str().to_string(),
    };
    match RelayFrame::from_payload(events::JOIN_ROOM, &payload) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(error = %e, "Failed to encode join frame");
            None
        }
    }
}

enum Attempt {
    Linked(Box<dyn RelayLink>),
    Failed(TransportError),
    Shutdown,
}

enum SessionEnd {
    Lost,
    Shutdown,
}

enum Wait {
    Elapsed,
    Shutdown,
}

/// Background task owning the relay link. Sole writer of [`LinkState`].
pub(crate) async fn connection_loop(
    ctx: LoopContext,
    mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
) {
    if let Wait::Shutdown = wait_for_connect(&mut command_rx).await {
        ctx.set_state(LinkState::Disconnected);
        return;
    }

    let base_delay = ctx.config.reconnect_delay;
    let mut delay = base_delay;
    let mut failures: u32 = 0;

    loop {
        ctx.set_state(LinkState::Connecting);
        info!(room = %ctx.token, "Connecting to relay");

        match attempt(&ctx, &mut command_rx).await {
            Attempt::Linked(link) => {
                failures = 0;
                delay = base_delay;
                match run_session(&ctx, link, &mut command_rx).await {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Lost => {
                        ctx.set_state(LinkState::Disconnected);
                        ctx.dispatch(RelayEvent::Disconnected);
                    }
                }
            }
            Attempt::Failed(e) => {
                failures += 1;
                warn!(error = %e, attempt = failures, "Relay connection failed");
                ctx.set_state(LinkState::Disconnected);
                if let Some(max) = ctx.config.max_reconnect_attempts {
                    if failures >= max {
                        warn!(attempts = failures, "Relay unreachable, giving up");
                        ctx.unreachable.store(true, Ordering::SeqCst);
                        ctx.dispatch(RelayEvent::Unreachable);
                        return;
                    }
                }
            }
            Attempt::Shutdown => break,
        }

        info!(delay_ms = delay.as_millis() as u64, "Reconnecting");
        if let Wait::Shutdown = backoff(&mut command_rx, delay).await {
            break;
        }
        delay = (delay * 2).min(ctx.config.max_reconnect_delay);
    }

    ctx.set_state(LinkState::Disconnected);
    info!("Relay connection loop stopped");
}

/// Idle until the first `connect()`. Sends issued meanwhile are dropped.
async fn wait_for_connect(
    command_rx: &mut mpsc::UnboundedReceiver<ConnectionCommand>,
) -> Wait {
    loop {
        match command_rx.recv().await {
            Some(ConnectionCommand::Connect) => return Wait::Elapsed,
            Some(ConnectionCommand::Send(frame)) => {
                debug!(event = %frame.event, "Not connected, dropping frame");
            }
            Some(ConnectionCommand::Shutdown) | None => return Wait::Shutdown,
        }
    }
}

async fn attempt(
    ctx: &LoopContext,
    command_rx: &mut mpsc::UnboundedReceiver<ConnectionCommand>,
) -> Attempt {
    let connect = tokio::time::timeout(ctx.config.connect_timeout, ctx.connector.connect());
    tokio::pin!(connect);

    loop {
        tokio::select! {
            result = &mut connect => {
                return match result {
                    Ok(Ok(link)) => Attempt::Linked(link),
                    Ok(Err(e)) => Attempt::Failed(e),
                    Err(_) => Attempt::Failed(TransportError::Connect(format!(
                        "timed out after {}s",
                        ctx.config.connect_timeout.as_secs()
                    ))),
                };
            }
            cmd = command_rx.recv() => match cmd {
                Some(ConnectionCommand::Connect) => {}
                Some(ConnectionCommand::Send(frame)) => {
                    debug!(event = %frame.event, "Connecting, dropping frame");
                }
                Some(ConnectionCommand::Shutdown) | None => return Attempt::Shutdown,
            },
        }
    }
}

/// Announce membership, then pump commands and inbound frames until the
/// link drops or shutdown is requested.
async fn run_session(
    ctx: &LoopContext,
    mut link: Box<dyn RelayLink>,
    command_rx: &mut mpsc::UnboundedReceiver<ConnectionCommand>,
) -> SessionEnd {
    if let Some(frame) = join_frame(&ctx.token) {
        if let Err(e) = link.send(frame).await {
            warn!(error = %e, "Join announcement failed");
            link.close().await;
            return SessionEnd::Lost;
        }
    }

    ctx.set_state(LinkState::Joined);
    info!(room = %ctx.token, "Joined room");
    ctx.dispatch(RelayEvent::Connected);

    loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(ConnectionCommand::Send(frame)) => {
                    let event = frame.event.clone();
                    if let Err(e) = link.send(frame).await {
                        warn!(error = %e, event = %event, "Relay send failed");
                        link.close().await;
                        return SessionEnd::Lost;
                    }
                }
                Some(ConnectionCommand::Connect) => {}
                Some(ConnectionCommand::Shutdown) | None => {
                    link.close().await;
                    return SessionEnd::Shutdown;
                }
            },
            inbound = link.recv() => match inbound {
                Some(Ok(frame)) => {
                    if let Some(event) = translate_frame(&frame) {
                        ctx.dispatch(event);
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Relay link error");
                    link.close().await;
                    return SessionEnd::Lost;
                }
                None => {
                    info!("Relay closed the link");
                    return SessionEnd::Lost;
                }
            },
        }
    }
}

/// Sleep out the reconnect delay. An explicit `connect()` cuts it short.
async fn backoff(
    command_rx: &mut mpsc::UnboundedReceiver<ConnectionCommand>,
    delay: Duration,
) -> Wait {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return Wait::Elapsed,
            cmd = command_rx.recv() => match cmd {
                Some(ConnectionCommand::Connect) => return Wait::Elapsed,
                Some(ConnectionCommand::Send(frame)) => {
                    debug!(event = %frame.event, "Not connected, dropping frame");
                }
                Some(ConnectionCommand::Shutdown) | None => return Wait::Shutdown,
            },
        }
    }
}
