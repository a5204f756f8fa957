//! User-confirmed emergency alert.

use tracing::{info, warn};

use crate::connection::ConnectionManager;
use crate::protocol::{events, AlertTriggerPayload};

/// Question put to the user before an alert goes out.
pub const ALERT_PROMPT: &str = "Send an emergency alert to the owner?";

/// Yes/no confirmation from the user.
pub trait ConfirmationGate {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> ConfirmationGate for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Outcome reported to the caller. `Sent` never means delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Sent,
    Cancelled,
}

pub struct AlertTrigger {
    connection: ConnectionManager,
}

impl AlertTrigger {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    /// Ask for confirmation, then fire a single alert. No retry, no ack.
    pub fn trigger(&self, gate: &impl ConfirmationGate) -> AlertOutcome {
        if !gate.confirm(ALERT_PROMPT) {
            info!("Alert cancelled");
            return AlertOutcome::Cancelled;
        }

        let payload = AlertTriggerPayload {
            room_token: self.connection.room_token().to_string(),
        };
        if self.connection.send_payload(events::ALERT_TRIGGER, &payload) {
            info!("Alert sent");
        } else {
            warn!(state = ?self.connection.link_state(), "Alert issued while not joined");
        }
        AlertOutcome::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;

    use crate::connection::{ConnectionConfig, LinkState};
    use crate::protocol::AlertTriggerPayload;
    use crate::testing::{wait_for_state, wait_until, MockConnector};
    use crate::token::RoomToken;

    async fn joined() -> (MockConnector, AlertTrigger) {
        let relay = MockConnector::new();
        let conn = ConnectionManager::start(
            RoomToken::parse("ABC123").unwrap(),
            ConnectionConfig::default(),
            Arc::new(relay.clone()),
        );
        conn.connect();
        wait_for_state(&conn, LinkState::Joined).await;
        (relay, AlertTrigger::new(conn))
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_alert_is_sent_once() {
        let (relay, alert) = joined().await;
        let asked = Cell::new(None);

        let outcome = alert.trigger(&|prompt: &str| {
            asked.set(Some(prompt.to_string()));
            true
        });

        assert_eq!(outcome, AlertOutcome::Sent);
        assert_eq!(asked.take().as_deref(), Some(ALERT_PROMPT));
        wait_until(|| relay.sent_events(events::ALERT_TRIGGER).len() == 1).await;
        let payload: AlertTriggerPayload =
            relay.sent_events(events::ALERT_TRIGGER)[0].decode().unwrap();
        assert_eq!(payload.room_token, "ABC123");
    }

    #[tokio::test(start_paused = true)]
    async fn declined_alert_sends_nothing() {
        let (relay, alert) = joined().await;

        assert_eq!(alert.trigger(&|_: &str| false), AlertOutcome::Cancelled);
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert!(relay.sent_events(events::ALERT_TRIGGER).is_empty());
    }
}
