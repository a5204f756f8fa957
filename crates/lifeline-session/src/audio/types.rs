//! States, configuration, errors and the capture device seam.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Push-to-talk exchange state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioState {
    /// Ready to capture.
    #[default]
    Idle,
    /// A capture session is open (or its source is being acquired).
    Capturing,
    /// Capture ended; the clip is being assembled and sent.
    Finalizing,
    /// A clip just went out. Reverts to `Idle` on its own.
    Sent,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default cap on an assembled clip.
pub const DEFAULT_MAX_CLIP_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// How long `Sent` is shown. Zero goes straight back to `Idle`.
    pub sent_indicator: Duration,
    /// Chunks past this many bytes are dropped.
    pub max_clip_bytes: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sent_indicator: Duration::from_secs(2),
            max_clip_bytes: DEFAULT_MAX_CLIP_BYTES,
        }
    }
}

// ---------------------------------------------------------------------------
// Device seam
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioSourceError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("audio source unavailable: {0}")]
    Unavailable(String),
}

/// Stops an open capture. Must be idempotent.
pub trait CaptureControl: Send {
    fn stop(&mut self);
}

/// An open capture: raw chunks in arrival order plus a way to stop them.
pub struct CaptureStream {
    pub chunks: mpsc::Receiver<Vec<u8>>,
    pub control: Box<dyn CaptureControl>,
}

/// Audio capture device.
#[async_trait]
pub trait AudioSource: Send + Sync + 'static {
    async fn start(&self) -> Result<CaptureStream, AudioSourceError>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error("cannot start capture while {0:?}")]
    Busy(AudioState),

    #[error("no capture in progress")]
    NotCapturing,

    #[error("capture aborted")]
    Aborted,

    #[error(transparent)]
    Source(#[from] AudioSourceError),
}
