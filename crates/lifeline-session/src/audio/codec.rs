//! Binary to text codec for clip payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub fn encode(payload: &[u8]) -> String {
    STANDARD.encode(payload)
}

/// Decode a clip. Tolerates a `data:<mime>;base64,` prefix.
pub fn decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let body = match encoded.split_once(";base64,") {
        Some((prefix, body)) if prefix.starts_with("data:") => body,
        _ => encoded,
    };
    STANDARD.decode(body.trim())
}
