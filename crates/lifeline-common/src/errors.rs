use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),

    #[error("config write error: {0}")]
    WriteError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LifelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The session could not start. The message is user-facing.
    #[error("{0}")]
    Session(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("presence.heartbeat_interval_secs".into());
        assert_eq!(
            err.to_string(),
            "config validation error: presence.heartbeat_interval_secs"
        );
    }

    #[test]
    fn lifeline_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: LifelineError = config_err.into();
        assert!(matches!(err, LifelineError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn lifeline_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: LifelineError = io_err.into();
        assert!(matches!(err, LifelineError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn session_error_message_is_passed_through() {
        let err = LifelineError::Session("invalid session: missing room token".into());
        assert_eq!(err.to_string(), "invalid session: missing room token");
    }
}
