//! Helper session: wires every component onto one connection.

use std::sync::Arc;
use std::time::Duration;

use lifeline_common::LifelineError;
use tracing::{info, warn};

use crate::alert::AlertTrigger;
use crate::audio::{AudioConfig, AudioExchange, AudioSource};
use crate::chat::{ChatRelay, DEFAULT_MAX_MESSAGE_CHARS};
use crate::connection::{
    ConnectionConfig, ConnectionManager, EventKind, LinkState, RelayEvent, SubscriptionId,
};
use crate::heartbeat::PresenceHeartbeat;
use crate::location::{LocationConfig, LocationReporter, PositionSource};
use crate::log::EntryLog;
use crate::token::{LaunchContext, RoomToken, TokenError};
use crate::transport::Connector;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub connection: ConnectionConfig,
    pub heartbeat_interval: Duration,
    /// Sender name on outbound chat.
    pub role: String,
    /// Subscribe to the live position stream on start.
    pub continuous_location: bool,
    pub location: LocationConfig,
    pub audio: AudioConfig,
    pub max_message_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            heartbeat_interval: Duration::from_secs(5),
            role: "helper".into(),
            continuous_location: true,
            location: LocationConfig {
                locate_on_join: true,
                ..LocationConfig::default()
            },
            audio: AudioConfig::default(),
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
        }
    }
}

/// Device collaborators.
#[derive(Clone)]
pub struct Devices {
    pub position: Arc<dyn PositionSource>,
    pub audio: Arc<dyn AudioSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid session: {0}")]
    Token(#[from] TokenError),
}

impl From<SessionError> for LifelineError {
    fn from(e: SessionError) -> Self {
        LifelineError::Session(e.to_string())
    }
}

/// A running helper session.
///
/// Torn down explicitly with [`teardown`](Self::teardown) or on drop.
pub struct HelperSession {
    connection: ConnectionManager,
    heartbeat: PresenceHeartbeat,
    location: LocationReporter,
    audio: AudioExchange,
    chat: Arc<ChatRelay>,
    alert: AlertTrigger,
    log: EntryLog,
    subscriptions: Vec<SubscriptionId>,
    torn_down: bool,
}

impl HelperSession {
    /// Resolve the room token and bring the session up.
    ///
    /// A missing or malformed token is terminal: nothing is started.
    pub async fn start(
        launch: &LaunchContext,
        config: SessionConfig,
        devices: Devices,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, SessionError> {
        let token = RoomToken::resolve(launch)?;
        info!(room = %token, "Starting helper session");

        let connection = ConnectionManager::start(token, config.connection.clone(), connector);
        let log = EntryLog::new();
        let location =
            LocationReporter::new(connection.clone(), devices.position, config.location.clone());
        let audio = AudioExchange::new(
            connection.clone(),
            devices.audio,
            log.clone(),
            config.audio.clone(),
        );
        let chat = Arc::new(ChatRelay::new(
            connection.clone(),
            log.clone(),
            config.role.clone(),
            config.max_message_chars,
        ));
        let alert = AlertTrigger::new(connection.clone());

        let subscriptions = subscribe_handlers(&connection, &location, &audio, &chat);

        connection.connect();
        let heartbeat = PresenceHeartbeat::start(connection.clone(), config.heartbeat_interval);

        if config.continuous_location {
            if let Err(e) = location.start_continuous().await {
                warn!(error = %e, "Continuous location unavailable");
            }
        }

        Ok(Self {
            connection,
            heartbeat,
            location,
            audio,
            chat,
            alert,
            log,
            subscriptions,
            torn_down: false,
        })
    }

    pub fn room_token(&self) -> &RoomToken {
        self.connection.room_token()
    }

    pub fn link_state(&self) -> LinkState {
        self.connection.link_state()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn location(&self) -> &LocationReporter {
        &self.location
    }

    pub fn audio(&self) -> &AudioExchange {
        &self.audio
    }

    pub fn chat(&self) -> &ChatRelay {
        &self.chat
    }

    pub fn alert(&self) -> &AlertTrigger {
        &self.alert
    }

    pub fn log(&self) -> &EntryLog {
        &self.log
    }

    /// Stop every timer, handler, media handle and the connection.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.heartbeat.stop();
        for id in self.subscriptions.drain(..) {
            self.connection.unsubscribe(id);
        }
        self.audio.abort();
        self.location.stop();
        self.connection.shutdown();
        info!(room = %self.connection.room_token(), "Helper session torn down");
    }
}

impl Drop for HelperSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn subscribe_handlers(
    connection: &ConnectionManager,
    location: &LocationReporter,
    audio: &AudioExchange,
    chat: &Arc<ChatRelay>,
) -> Vec<SubscriptionId> {
    let mut ids = Vec::with_capacity(5);

    let reporter = location.clone();
    ids.push(connection.subscribe(EventKind::Connected, move |_| {
        reporter.resend_latest();
    }));

    let chat = Arc::clone(chat);
    ids.push(connection.subscribe(EventKind::ChatReceived, move |event| {
        if let RelayEvent::ChatReceived(payload) = event {
            chat.receive(payload);
        }
    }));

    let audio = audio.clone();
    ids.push(connection.subscribe(EventKind::AudioReceived, move |event| {
        if let RelayEvent::AudioReceived(payload) = event {
            audio.receive_remote(payload);
        }
    }));

    ids.push(connection.subscribe(EventKind::Disconnected, |_| {
        info!("Link lost, reconnecting");
    }));

    ids.push(connection.subscribe(EventKind::Unreachable, |_| {
        warn!("Relay unreachable, session offline");
    }));

    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::audio::AudioState;
    use crate::log::Origin;
    use crate::protocol::{
        events, ChatSendPayload, JoinRoomPayload, LocationUpdatePayload, RelayFrame,
    };
    use crate::testing::{
        sample, wait_for_state, wait_until, MockAudioSource, MockConnector, MockPositionSource,
    };

    struct Harness {
        relay: MockConnector,
        position: Arc<MockPositionSource>,
        mic: Arc<MockAudioSource>,
        session: HelperSession,
    }

    fn config() -> SessionConfig {
        SessionConfig {
            audio: AudioConfig {
                sent_indicator: Duration::ZERO,
                ..AudioConfig::default()
            },
            ..SessionConfig::default()
        }
    }

    async fn start(launch: LaunchContext, config: SessionConfig) -> Harness {
        let relay = MockConnector::new();
        let position = Arc::new(MockPositionSource::new(sample(48.85, 2.35)));
        let mic = Arc::new(MockAudioSource::new());
        let devices = Devices {
            position: position.clone(),
            audio: mic.clone(),
        };
        let session = HelperSession::start(&launch, config, devices, Arc::new(relay.clone()))
            .await
            .unwrap();
        Harness {
            relay,
            position,
            mic,
            session,
        }
    }

    async fn joined() -> Harness {
        let h = start(
            LaunchContext::from_code("https://lifeline.app/help?room=ABC123"),
            config(),
        )
        .await;
        wait_for_state(h.session.connection(), LinkState::Joined).await;
        h
    }

    #[tokio::test(start_paused = true)]
    async fn missing_token_starts_nothing() {
        let relay = MockConnector::new();
        let devices = Devices {
            position: Arc::new(MockPositionSource::new(sample(0.0, 0.0))),
            audio: Arc::new(MockAudioSource::new()),
        };
        let result = HelperSession::start(
            &LaunchContext::from_code("https://lifeline.app/help"),
            config(),
            devices,
            Arc::new(relay.clone()),
        )
        .await;

        assert!(matches!(result, Err(SessionError::Token(TokenError::Missing))));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(relay.attempts(), 0);
    }

    #[test]
    fn session_error_reads_as_invalid_session() {
        let err: LifelineError = SessionError::Token(TokenError::Missing).into();
        assert!(matches!(err, LifelineError::Session(_)));
        assert_eq!(
            err.to_string(),
            "invalid session: no room token in launch context"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn joins_and_announces_exactly_once() {
        let h = joined().await;

        assert_eq!(h.session.room_token().as_str(), "ABC123");
        let joins = h.relay.sent_events(events::JOIN_ROOM);
        assert_eq!(joins.len(), 1);
        let payload: JoinRoomPayload = joins[0].decode().unwrap();
        assert_eq!(payload.room_token, "ABC123");
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_reannounces_while_joined() {
        let h = joined().await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        let before = h.relay.sent_events(events::JOIN_ROOM).len();

        // Ticks at 5s and 10s.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.relay.sent_events(events::JOIN_ROOM).len(), before + 2);
        assert_eq!(h.relay.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn chat_is_logged_then_sent() {
        let h = joined().await;

        h.session.chat().send("help").unwrap();
        let chats = h.session.log().chats();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].origin, Origin::Local);
        assert_eq!(chats[0].body, "help");

        wait_until(|| h.relay.sent_events(events::CHAT_SEND).len() == 1).await;
        let sent: ChatSendPayload = h.relay.sent_events(events::CHAT_SEND)[0].decode().unwrap();
        assert_eq!(sent.text, "help");
        assert_eq!(sent.sender, "helper");
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_events_land_in_the_log() {
        let h = joined().await;

        h.relay.deliver(RelayFrame::new(
            events::CHAT_RECEIVE,
            json!({"text": "where are you?", "sender": "owner"}),
        ));
        h.relay.deliver(RelayFrame::new(
            events::AUDIO_RECEIVE,
            json!({"encodedAudio": "AAEC"}),
        ));
        wait_until(|| h.session.log().len() == 2).await;

        let chats = h.session.log().chats();
        assert_eq!(chats[0].origin, Origin::Remote);
        assert_eq!(chats[0].body, "where are you?");
        let clips = h.session.log().clips();
        assert_eq!(&*clips[0].payload, &[0, 1, 2]);
        assert_eq!(h.session.audio().state(), AudioState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn position_is_resent_after_reconnect() {
        let mut config = config();
        config.location.locate_on_join = false;
        let h = start(LaunchContext::from_room("ABC123"), config).await;
        wait_for_state(h.session.connection(), LinkState::Joined).await;
        h.position.push(Ok(sample(1.0, 2.0))).await;
        wait_until(|| h.relay.sent_events(events::LOCATION_UPDATE).len() >= 1).await;
        let before = h.relay.sent_events(events::LOCATION_UPDATE).len();

        h.relay.drop_link();
        wait_for_state(h.session.connection(), LinkState::Disconnected).await;
        wait_for_state(h.session.connection(), LinkState::Joined).await;

        wait_until(|| h.relay.sent_events(events::LOCATION_UPDATE).len() == before + 1).await;
        let last: LocationUpdatePayload = h
            .relay
            .sent_events(events::LOCATION_UPDATE)
            .last()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(last.lat, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn push_to_talk_round_trip() {
        let h = joined().await;
        let audio = h.session.audio();

        audio.begin_capture().await.unwrap();
        for chunk in [[1u8, 2], [3, 4], [5, 6]] {
            h.mic.emit(&chunk).await;
        }
        audio.end_capture().await.unwrap();

        assert_eq!(audio.state(), AudioState::Idle);
        assert_eq!(h.session.log().clips().len(), 1);
        wait_until(|| h.relay.sent_events(events::AUDIO_SEND).len() == 1).await;
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_leaves_nothing_running() {
        let mut h = joined().await;
        let conn = h.session.connection().clone();
        h.session.audio().begin_capture().await.unwrap();
        assert!(h.mic.is_open());
        assert!(h.position.is_watched());

        h.session.teardown();

        assert_eq!(conn.subscriber_count(), 0);
        assert!(!h.mic.is_open());
        wait_for_state(&conn, LinkState::Disconnected).await;
        wait_until(|| !h.position.is_watched()).await;

        let joins = h.relay.sent_events(events::JOIN_ROOM).len();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(h.relay.sent_events(events::JOIN_ROOM).len(), joins);
        assert_eq!(h.relay.attempts(), 1);
    }
}
