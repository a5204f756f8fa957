pub mod alert;
pub mod audio;
pub mod chat;
pub mod connection;
pub mod heartbeat;
pub mod location;
pub mod log;
pub mod protocol;
pub mod session;
pub mod token;
pub mod transport;

#[cfg(test)]
mod testing;

pub use alert::{AlertOutcome, AlertTrigger, ConfirmationGate, ALERT_PROMPT};
pub use audio::{
    AudioConfig, AudioError, AudioExchange, AudioSource, AudioSourceError, AudioState,
    CaptureControl, CaptureStream,
};
pub use chat::{ChatError, ChatRelay};
pub use connection::{
    ConnectionConfig, ConnectionManager, EventKind, LinkState, RelayEvent, SubscriptionId,
};
pub use heartbeat::{HeartbeatTarget, PresenceHeartbeat};
pub use location::{
    LocationConfig, LocationError, LocationPolicy, LocationReporter, PositionSample,
    PositionSource, PositionStream,
};
pub use log::{AudioClip, ChatEntry, EntryLog, LogEntry, Origin};
pub use protocol::RelayFrame;
pub use session::{Devices, HelperSession, SessionConfig, SessionError};
pub use token::{LaunchContext, RoomToken, TokenError};
pub use transport::{Connector, RelayLink, TransportError, WsConnector};
