//! Room token resolution from the launch context.
//!
//! A helper device is launched from a scanned pairing code such as
//! `https://lifeline.app/help?room=ABC123`. The token is read exactly once;
//! if it is missing or malformed the session never starts.

use std::fmt;

/// Longest token accepted.
pub const MAX_TOKEN_LEN: usize = 128;

/// Query keys that carry the room token in a pairing URL.
const TOKEN_KEYS: [&str; 2] = ["room", "token"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("no room token in launch context")]
    Missing,

    #[error("invalid room token: {0}")]
    Invalid(String),
}

/// What the helper was launched with.
#[derive(Debug, Clone, Default)]
pub struct LaunchContext {
    /// Scanned code contents: a pairing URL or a bare token.
    pub code: Option<String>,
    /// Explicit token (command line or environment). Takes precedence.
    pub room: Option<String>,
}

impl LaunchContext {
    pub fn from_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            room: None,
        }
    }

    pub fn from_room(room: impl Into<String>) -> Self {
        Self {
            code: None,
            room: Some(room.into()),
        }
    }
}

/// Opaque identifier of the room shared by one helper and one owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomToken(String);

impl RoomToken {
    /// Resolve and validate the token from a launch context.
    pub fn resolve(launch: &LaunchContext) -> Result<Self, TokenError> {
        if let Some(room) = launch.room.as_deref().filter(|r| !r.trim().is_empty()) {
            return Self::parse(room);
        }
        match launch.code.as_deref() {
            Some(code) => match token_from_code(code)? {
                Some(raw) => Self::parse(&raw),
                None => Err(TokenError::Missing),
            },
            None => Err(TokenError::Missing),
        }
    }

    /// Validate a raw token string.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::Invalid(format!(
                "{} characters, limit is {MAX_TOKEN_LEN}",
                token.len()
            )));
        }
        if let Some(bad) = token
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(TokenError::Invalid(format!("unexpected character {bad:?}")));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pull the raw token out of scanned code contents.
///
/// URLs carry it in the query string; anything without a scheme is the
/// token itself.
fn token_from_code(code: &str) -> Result<Option<String>, TokenError> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(None);
    }

    let Some((_, query)) = code.split_once('?') else {
        if code.contains("://") {
            return Ok(None);
        }
        return Ok(Some(code.to_string()));
    };

    let query = query.split('#').next().unwrap_or_default();
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if TOKEN_KEYS.contains(&key) {
            let decoded = urlencoding::decode(value)
                .map_err(|e| TokenError::Invalid(format!("bad percent-encoding: {e}")))?;
            return Ok(Some(decoded.into_owned()));
        }
    }
    Ok(None)
}
