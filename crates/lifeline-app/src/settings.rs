//! Maps the on-disk config onto the session's runtime settings.

use std::time::Duration;

use lifeline_config::schema::LocationPolicyKind;
use lifeline_config::LifelineConfig;
use lifeline_session::{
    AudioConfig, ConnectionConfig, LocationConfig, LocationPolicy, SessionConfig,
};

pub fn session_config(config: &LifelineConfig) -> SessionConfig {
    let relay = &config.relay;
    let connection = ConnectionConfig {
        connect_timeout: Duration::from_secs(u64::from(relay.connect_timeout_secs)),
        reconnect_delay: Duration::from_secs(u64::from(relay.reconnect_delay_secs)),
        max_reconnect_delay: Duration::from_secs(u64::from(relay.max_reconnect_delay_secs)),
        max_reconnect_attempts: match relay.max_reconnect_attempts {
            0 => None,
            n => Some(n),
        },
    };

    let policy = match config.location.policy {
        LocationPolicyKind::EverySample => LocationPolicy::EverySample,
        LocationPolicyKind::Throttled => LocationPolicy::Throttled {
            min_interval: Duration::from_millis(u64::from(config.location.min_interval_ms)),
        },
        LocationPolicyKind::OnJoinOnly => LocationPolicy::OnJoinOnly,
    };

    SessionConfig {
        connection,
        heartbeat_interval: Duration::from_secs(u64::from(
            config.presence.heartbeat_interval_secs,
        )),
        role: config.presence.role.clone(),
        continuous_location: config.location.continuous,
        location: LocationConfig {
            policy,
            locate_on_join: config.location.locate_on_join,
        },
        audio: AudioConfig {
            sent_indicator: Duration::from_millis(u64::from(config.audio.sent_indicator_ms)),
            max_clip_bytes: config.audio.max_clip_kb as usize * 1024,
        },
        max_message_chars: config.chat.max_message_chars as usize,
    }
}

const LOG_TARGETS: [&str; 3] = ["lifeline", "lifeline_session", "lifeline_config"];

/// Filter directives for the subscriber: an explicit override wins, else the
/// configured level scoped to the lifeline crates.
pub fn log_directives(override_level: Option<&str>, config: &LifelineConfig) -> Vec<String> {
    match override_level {
        Some(level) => vec![level.to_string()],
        None => LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={}", config.logging.level.as_directive()))
            .collect(),
    }
}
