use serde::{Deserialize, Serialize};

/// Connection settings for the WebSocket relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// WebSocket URL of the relay server.
    pub url: String,
    /// Seconds to wait for a single connection attempt.
    pub connect_timeout_secs: u32,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u32,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u32,
    /// Consecutive failed attempts before giving up. `0` retries forever.
    pub max_reconnect_attempts: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "wss://relay.lifeline.app/ws".into(),
            connect_timeout_secs: 15,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
            max_reconnect_attempts: 0,
        }
    }
}
