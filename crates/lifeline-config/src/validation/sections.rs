//! Per-section validators: relay, presence, location, audio and chat.

use crate::schema::{LifelineConfig, LocationPolicyKind};

use super::helpers::validate_range;

/// Validate relay constraints.
pub(crate) fn validate_relay(errors: &mut Vec<String>, config: &LifelineConfig) {
    let relay = &config.relay;
    if !(relay.url.starts_with("ws://") || relay.url.starts_with("wss://")) {
        errors.push(format!(
            "relay.url = {:?} must start with ws:// or wss://",
            relay.url
        ));
    }
    validate_range(
        errors,
        "relay.connect_timeout_secs",
        relay.connect_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "relay.reconnect_delay_secs",
        relay.reconnect_delay_secs,
        1,
        60,
    );
    if relay.max_reconnect_delay_secs < relay.reconnect_delay_secs {
        errors.push(format!(
            "relay.max_reconnect_delay_secs = {} is below relay.reconnect_delay_secs = {}",
            relay.max_reconnect_delay_secs, relay.reconnect_delay_secs
        ));
    }
}

/// Validate presence constraints.
pub(crate) fn validate_presence(errors: &mut Vec<String>, config: &LifelineConfig) {
    validate_range(
        errors,
        "presence.heartbeat_interval_secs",
        config.presence.heartbeat_interval_secs,
        1,
        300,
    );
    if config.presence.role.trim().is_empty() {
        errors.push("presence.role must not be empty".to_string());
    }
}

/// Validate location constraints.
pub(crate) fn validate_location(errors: &mut Vec<String>, config: &LifelineConfig) {
    if config.location.policy == LocationPolicyKind::Throttled {
        validate_range(
            errors,
            "location.min_interval_ms",
            config.location.min_interval_ms,
            100,
            600_000,
        );
    }
}

/// Validate audio constraints.
pub(crate) fn validate_audio(errors: &mut Vec<String>, config: &LifelineConfig) {
    validate_range(
        errors,
        "audio.max_clip_kb",
        config.audio.max_clip_kb,
        16,
        8192,
    );
    validate_range(
        errors,
        "audio.sent_indicator_ms",
        config.audio.sent_indicator_ms,
        0,
        30_000,
    );
}

/// Validate chat constraints.
pub(crate) fn validate_chat(errors: &mut Vec<String>, config: &LifelineConfig) {
    validate_range(
        errors,
        "chat.max_message_chars",
        config.chat.max_message_chars,
        1,
        10_000,
    );
}
