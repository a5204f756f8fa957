//! Wire protocol types for the Lifeline room relay.
//!
//! Every frame on the relay socket is a JSON envelope
//! `{"event": "<name>", "data": {...}}`. The relay fans frames out to the
//! other member of the room without inspecting `data`; the payload structs
//! below define what each event carries.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event names used on the relay socket.
pub mod events {
    /// Membership assertion. Idempotent on the relay side.
    pub const JOIN_ROOM: &str = "join_room";
    pub const LOCATION_UPDATE: &str = "location_update";
    pub const CHAT_SEND: &str = "chat_send";
    pub const AUDIO_SEND: &str = "audio_send";
    pub const ALERT_TRIGGER: &str = "alert_trigger";

    pub const CHAT_RECEIVE: &str = "chat_receive";
    pub const AUDIO_RECEIVE: &str = "audio_receive";
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A single relay frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl RelayFrame {
    pub fn new(event: &str, data: serde_json::Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }

    /// Build a frame from a typed payload.
    pub fn from_payload<T: Serialize>(event: &str, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event, serde_json::to_value(payload)?))
    }

    /// Decode the frame's data into a typed payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomPayload {
    pub room_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdatePayload {
    pub room_token: String,
    pub lat: f64,
    pub lng: f64,
    /// Capture time in milliseconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub captured_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendPayload {
    pub room_token: String,
    pub text: String,
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSendPayload {
    pub room_token: String,
    pub encoded_audio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertTriggerPayload {
    pub room_token: String,
}

// ---------------------------------------------------------------------------
// Inbound payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReceivePayload {
    pub text: String,
    #[serde(default)]
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioReceivePayload {
    pub encoded_audio: String,
}
