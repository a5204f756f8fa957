//! Push-to-talk audio exchange.
//!
//! A capture runs from begin to end, its raw chunks are concatenated into one
//! clip, base64-encoded and sent to the room if the link is joined. The clip
//! is appended to the entry log either way. Remote clips are decoded into the
//! same log and never played back here.

pub mod codec;
mod machine;
mod types;


pub use machine::AudioExchange;
pub use types::{
    AudioConfig, AudioError, AudioSource, AudioSourceError, AudioState, CaptureControl,
    CaptureStream, DEFAULT_MAX_CLIP_BYTES,
};
