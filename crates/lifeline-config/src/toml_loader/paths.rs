//! Where the config file lives, and seeding it on first run.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use lifeline_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LIFELINE_CONFIG";

const APP_DIR: &str = "lifeline";
const FILE_NAME: &str = "config.toml";

/// `$LIFELINE_CONFIG` when set, else `<platform config dir>/lifeline/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    resolve_config_path(std::env::var_os(CONFIG_ENV), dirs::config_dir())
}

pub(crate) fn resolve_config_path(
    explicit: Option<OsString>,
    platform_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    platform_dir
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::WriteError(format!("no config directory; set {CONFIG_ENV}")))
}

/// Write the commented template to `path` unless something is already there.
///
/// Returns `true` when a file was written.
pub fn create_default_config(path: &Path) -> Result<bool, ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(write_error(path, e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| write_error(path, e))?;

    info!(path = %path.display(), "Wrote default config");
    Ok(true)
}

fn write_error(path: &Path, e: io::Error) -> ConfigError {
    ConfigError::WriteError(format!("{}: {e}", path.display()))
}
