//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Lifeline Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[relay]
url = "wss://relay.lifeline.app/ws"
# connect_timeout_secs = 15       # 1-120
# reconnect_delay_secs = 1        # 1-60
# max_reconnect_delay_secs = 30   # >= reconnect_delay_secs
# max_reconnect_attempts = 0      # 0 = retry forever

[presence]
# heartbeat_interval_secs = 5     # 1-300
# role = "helper"

[location]
# continuous = true
# policy = "every_sample"         # every_sample, throttled, on_join_only
# min_interval_ms = 2000          # 100-600000, throttled policy only
# locate_on_join = true

[audio]
# sent_indicator_ms = 2000        # 0 disables the "sent" state
# max_clip_kb = 1024              # 16-8192
# interaction = "hold"            # hold, toggle

[chat]
# max_message_chars = 2000        # 1-10000

[logging]
# level = "INFO"                  # TRACE, DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
