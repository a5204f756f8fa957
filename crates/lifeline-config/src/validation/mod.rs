//! Full configuration validation.
//!
//! Validates numeric ranges and URL shape. Each section has its own
//! validator; this orchestrator calls them all and collects errors into a
//! single `ConfigError`.

mod helpers;
mod sections;


use crate::schema::LifelineConfig;
use lifeline_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &LifelineConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_relay(&mut errors, config);
    sections::validate_presence(&mut errors, config);
    sections::validate_location(&mut errors, config);
    sections::validate_audio(&mut errors, config);
    sections::validate_chat(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
