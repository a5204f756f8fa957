//! Inbound frame translation.

use tracing::{debug, warn};

use crate::protocol::{events, AudioReceivePayload, ChatReceivePayload, RelayFrame};

use super::types::RelayEvent;

/// Turn an inbound relay frame into a typed event, if it is one we handle.
pub(crate) fn translate_frame(frame: &RelayFrame) -> Option<RelayEvent> {
    match frame.event.as_str() {
        events::CHAT_RECEIVE => match frame.decode::<ChatReceivePayload>() {
            Ok(payload) => Some(RelayEvent::ChatReceived(payload)),
            Err(e) => {
                warn!(error = %e, "Malformed chat frame");
                None
            }
        },
        events::AUDIO_RECEIVE => match frame.decode::<AudioReceivePayload>() {
            Ok(payload) => Some(RelayEvent::AudioReceived(payload)),
            Err(e) => {
                warn!(error = %e, "Malformed audio frame");
                None
            }
        },
        other => {
            debug!(event = %other, "Unhandled relay event");
            None
        }
    }
}
