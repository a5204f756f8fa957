//! Location, audio and chat configuration types.

use serde::{Deserialize, Serialize};

/// How location samples are forwarded while joined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum LocationPolicyKind {
    /// Forward every sample the source produces.
    #[default]
    EverySample,
    /// Forward at most one sample per `min_interval_ms`.
    Throttled,
    /// Only send the latest known sample when (re)joining.
    OnJoinOnly,
}

/// Location reporting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Subscribe to the live position stream on startup.
    pub continuous: bool,
    pub policy: LocationPolicyKind,
    /// Minimum spacing between forwarded samples for the throttled policy
    /// (valid range: 100-600000).
    pub min_interval_ms: u32,
    /// Request a silent one-shot fix on join when no position is known yet.
    pub locate_on_join: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            continuous: true,
            policy: LocationPolicyKind::EverySample,
            min_interval_ms: 2000,
            locate_on_join: true,
        }
    }
}

/// Push-to-talk interaction model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum InteractionMode {
    /// Capture while the control is held.
    #[default]
    Hold,
    /// Each activation alternates between start and stop.
    Toggle,
}

/// Voice clip configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// How long the "sent" indicator lingers before returning to idle.
    /// `0` skips it.
    pub sent_indicator_ms: u32,
    /// Upper bound on an assembled clip, in KiB (valid range: 16-8192).
    pub max_clip_kb: u32,
    pub interaction: InteractionMode,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sent_indicator_ms: 2000,
            max_clip_kb: 1024,
            interaction: InteractionMode::Hold,
        }
    }
}

/// Text chat configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Longest accepted message body, in characters (valid range: 1-10000).
    pub max_message_chars: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 2000,
        }
    }
}
