//! Text chat over the room relay.
//!
//! Local messages are appended to the log before they are forwarded, and are
//! forwarded whatever the link state; the relay gives no acknowledgement.

use tracing::debug;

use crate::connection::ConnectionManager;
use crate::log::{ChatEntry, EntryLog, Origin};
use crate::protocol::{events, ChatReceivePayload, ChatSendPayload};

/// Default cap on a single message, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    Empty,

    #[error("message is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },
}

pub struct ChatRelay {
    connection: ConnectionManager,
    log: EntryLog,
    sender: String,
    max_chars: usize,
}

impl ChatRelay {
    /// `sender` is the role name attached to outbound messages.
    pub fn new(
        connection: ConnectionManager,
        log: EntryLog,
        sender: impl Into<String>,
        max_chars: usize,
    ) -> Self {
        Self {
            connection,
            log,
            sender: sender.into(),
            max_chars,
        }
    }

    /// Append a local message and forward it to the room.
    pub fn send(&self, text: &str) -> Result<ChatEntry, ChatError> {
        let body = text.trim();
        if body.is_empty() {
            return Err(ChatError::Empty);
        }
        let len = body.chars().count();
        if len > self.max_chars {
            return Err(ChatError::TooLong {
                len,
                max: self.max_chars,
            });
        }

        let entry = self.log.push_chat(ChatEntry::new(Origin::Local, body));

        let payload = ChatSendPayload {
            room_token: self.connection.room_token().to_string(),
            text: entry.body.clone(),
            sender: self.sender.clone(),
        };
        if !self.connection.send_payload(events::CHAT_SEND, &payload) {
            debug!("Chat message kept locally only");
        }
        Ok(entry)
    }

    /// Append a message received from the room.
    pub fn receive(&self, payload: &ChatReceivePayload) -> ChatEntry {
        debug!(sender = %payload.sender, "Chat message received");
        self.log
            .push_chat(ChatEntry::new(Origin::Remote, payload.text.clone()))
    }

    pub fn log(&self) -> &EntryLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::connection::{ConnectionConfig, LinkState};
    use crate::protocol::ChatSendPayload;
    use crate::testing::{wait_for_state, wait_until, MockConnector};
    use crate::token::RoomToken;

    fn relay_and_chat(max_chars: usize) -> (MockConnector, ConnectionManager, ChatRelay) {
        let relay = MockConnector::new();
        let conn = ConnectionManager::start(
            RoomToken::parse("ABC123").unwrap(),
            ConnectionConfig::default(),
            Arc::new(relay.clone()),
        );
        let chat = ChatRelay::new(conn.clone(), EntryLog::new(), "helper", max_chars);
        (relay, conn, chat)
    }

    #[tokio::test(start_paused = true)]
    async fn send_appends_then_forwards() {
        let (relay, conn, chat) = relay_and_chat(DEFAULT_MAX_MESSAGE_CHARS);
        conn.connect();
        wait_for_state(&conn, LinkState::Joined).await;

        let entry = chat.send("  help ").unwrap();
        assert_eq!(entry.body, "help");
        assert_eq!(entry.origin, Origin::Local);
        assert_eq!(chat.log().chats(), vec![entry]);

        wait_until(|| relay.sent_events(events::CHAT_SEND).len() == 1).await;
        let sent: ChatSendPayload = relay.sent_events(events::CHAT_SEND)[0].decode().unwrap();
        assert_eq!(
            sent,
            ChatSendPayload {
                room_token: "ABC123".into(),
                text: "help".into(),
                sender: "helper".into(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn send_while_disconnected_is_local_only() {
        let (relay, _conn, chat) = relay_and_chat(DEFAULT_MAX_MESSAGE_CHARS);

        chat.send("anyone?").unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;

        assert_eq!(chat.log().len(), 1);
        assert!(relay.sent().is_empty());
    }

    #[tokio::test]
    async fn rejects_blank_and_overlong_text() {
        let (_relay, _conn, chat) = relay_and_chat(5);

        assert_eq!(chat.send(""), Err(ChatError::Empty));
        assert_eq!(chat.send(" \n\t "), Err(ChatError::Empty));
        assert_eq!(
            chat.send("toolong"),
            Err(ChatError::TooLong { len: 7, max: 5 })
        );
        // Counted in characters, not bytes.
        assert!(chat.send("héllo").is_ok());
        assert_eq!(chat.log().len(), 1);
    }

    #[tokio::test]
    async fn received_messages_follow_arrival_order() {
        let (_relay, _conn, chat) = relay_and_chat(DEFAULT_MAX_MESSAGE_CHARS);

        chat.send("first").unwrap();
        chat.receive(&ChatReceivePayload {
            text: "second".into(),
            sender: "owner".into(),
        });
        chat.send("third").unwrap();

        let log: Vec<(Origin, String)> = chat
            .log()
            .chats()
            .into_iter()
            .map(|c| (c.origin, c.body))
            .collect();
        assert_eq!(
            log,
            vec![
                (Origin::Local, "first".to_string()),
                (Origin::Remote, "second".to_string()),
                (Origin::Local, "third".to_string()),
            ]
        );
    }
}
