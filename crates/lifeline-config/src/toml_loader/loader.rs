//! Reading and parsing config files.

use std::io;
use std::path::Path;

use lifeline_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};
use crate::schema::LifelineConfig;
use crate::validation;

/// Parse config text. Missing fields take their defaults; a file whose
/// values fail validation is replaced by the defaults as a whole.
pub fn parse_config(content: &str) -> Result<LifelineConfig, ConfigError> {
    let config: LifelineConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    match validation::validate(&config) {
        Ok(()) => Ok(config),
        Err(e) => {
            warn!(error = %e, "Invalid config values, using defaults");
            Ok(LifelineConfig::default())
        }
    }
}

/// Load config from a specific file.
pub fn load_from_path(path: &Path) -> Result<LifelineConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };

    let config = parse_config(&content)?;
    info!(path = %path.display(), "Config loaded");
    Ok(config)
}

/// Load config from the default location, seeding it with the commented
/// template on first run.
pub fn load_default() -> Result<LifelineConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(&path)?;
            Ok(LifelineConfig::default())
        }
        other => other,
    }
}
