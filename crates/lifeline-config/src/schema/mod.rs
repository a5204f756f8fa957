//! Configuration schema types for Lifeline.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults the session engine expects.

mod media;
mod presence;
mod relay;
mod system;

pub use media::*;
pub use presence::*;
pub use relay::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Lifeline.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct LifelineConfig {
    pub relay: RelayConfig,
    pub presence: PresenceConfig,
    pub location: LocationConfig,
    pub audio: AudioConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================
