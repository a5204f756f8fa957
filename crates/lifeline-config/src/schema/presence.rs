//! Room presence configuration types.

use serde::{Deserialize, Serialize};

/// Membership heartbeat configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Seconds between join re-announcements (valid range: 1-300).
    pub heartbeat_interval_secs: u32,
    /// Role name this device reports as the chat sender.
    pub role: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 5,
            role: "helper".into(),
        }
    }
}
