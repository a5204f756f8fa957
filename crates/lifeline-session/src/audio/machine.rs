//! Push-to-talk state machine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::ConnectionManager;
use crate::log::{AudioClip, EntryLog, Origin};
use crate::protocol::{events, AudioReceivePayload, AudioSendPayload};

use super::codec;
use super::types::{AudioConfig, AudioError, AudioSource, AudioState, CaptureControl};

/// How long finalizing waits for the source to flush its last chunks.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Default)]
struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    bytes: usize,
    full: bool,
    dropped: usize,
}

impl ChunkBuffer {
    fn push(&mut self, chunk: Vec<u8>, max_bytes: usize) {
        if self.full || self.bytes + chunk.len() > max_bytes {
            if !self.full {
                warn!(max_bytes, "Clip size limit reached, dropping further audio");
            }
            self.full = true;
            self.dropped += chunk.len();
            return;
        }
        self.bytes += chunk.len();
        self.chunks.push(chunk);
    }
}

/// The single open capture session.
struct Capture {
    control: Box<dyn CaptureControl>,
    pump: JoinHandle<()>,
    buffer: Arc<Mutex<ChunkBuffer>>,
}

#[derive(Default)]
struct Machine {
    state: AudioState,
    /// Source acquisition in flight. Reported as `Capturing`.
    acquiring: bool,
    capture: Option<Capture>,
    /// Bumped on every begin and abort so stale completions are ignored.
    generation: u64,
    last_error: Option<AudioError>,
    sent_timer: Option<JoinHandle<()>>,
}

struct Inner {
    connection: ConnectionManager,
    source: Arc<dyn AudioSource>,
    log: EntryLog,
    config: AudioConfig,
    machine: Mutex<Machine>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the machine to `Idle` if a `begin_capture` future is dropped
/// while its source is still being acquired.
struct PendingAcquisition<'a> {
    inner: &'a Inner,
    generation: u64,
    armed: bool,
}

impl Drop for PendingAcquisition<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut m = self.inner.lock();
        if m.generation == self.generation && m.acquiring {
            m.generation += 1;
            m.acquiring = false;
            m.state = AudioState::Idle;
            debug!("Capture acquisition cancelled by caller");
        }
    }
}

/// Capture, encode and send voice clips. One session at a time.
///
/// Hold-to-talk maps onto [`press`](Self::press) / [`release`](Self::release)
/// / [`pointer_left`](Self::pointer_left); tap-to-talk onto
/// [`toggle`](Self::toggle). Both drive the same machine.
#[derive(Clone)]
pub struct AudioExchange {
    inner: Arc<Inner>,
}

impl AudioExchange {
    pub fn new(
        connection: ConnectionManager,
        source: Arc<dyn AudioSource>,
        log: EntryLog,
        config: AudioConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                connection,
                source,
                log,
                config,
                machine: Mutex::new(Machine::default()),
            }),
        }
    }

    pub fn state(&self) -> AudioState {
        self.inner.lock().state
    }

    /// Last failure, cleared when a capture opens successfully.
    pub fn last_error(&self) -> Option<AudioError> {
        self.inner.lock().last_error.clone()
    }

    /// Open a capture session. Rejected unless idle.
    ///
    /// Dropping the returned future before the source opens cancels the
    /// acquisition and leaves the machine `Idle`.
    pub async fn begin_capture(&self) -> Result<(), AudioError> {
        let generation = {
            let mut m = self.inner.lock();
            match m.state {
                AudioState::Idle | AudioState::Sent => {}
                busy => {
                    debug!(state = ?busy, "Capture already in progress");
                    return Err(AudioError::Busy(busy));
                }
            }
            if let Some(timer) = m.sent_timer.take() {
                timer.abort();
            }
            m.generation += 1;
            m.state = AudioState::Capturing;
            m.acquiring = true;
            m.generation
        };

        let mut pending = PendingAcquisition {
            inner: &self.inner,
            generation,
            armed: true,
        };
        let result = self.inner.source.start().await;
        pending.armed = false;

        let mut m = self.inner.lock();
        if m.generation != generation {
            // Ended or aborted while acquiring.
            if let Ok(mut stream) = result {
                stream.control.stop();
            }
            return Err(AudioError::Aborted);
        }
        m.acquiring = false;

        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Audio source unavailable");
                m.state = AudioState::Idle;
                let err = AudioError::from(e);
                m.last_error = Some(err.clone());
                return Err(err);
            }
        };

        let buffer = Arc::new(Mutex::new(ChunkBuffer::default()));
        let pump = tokio::spawn(pump_chunks(
            stream.chunks,
            Arc::clone(&buffer),
            self.inner.config.max_clip_bytes,
        ));
        m.capture = Some(Capture {
            control: stream.control,
            pump,
            buffer,
        });
        m.last_error = None;
        info!("Capture started");
        Ok(())
    }

    /// Close the capture, assemble the clip and send it if joined.
    ///
    /// The clip is always appended to the log. Ending while the source is
    /// still being acquired cancels the acquisition and yields an empty clip.
    pub async fn end_capture(&self) -> Result<Option<AudioClip>, AudioError> {
        let (capture, generation) = {
            let mut m = self.inner.lock();
            if m.state != AudioState::Capturing {
                return Err(AudioError::NotCapturing);
            }
            if m.acquiring {
                m.generation += 1;
                m.acquiring = false;
                m.state = AudioState::Finalizing;
                debug!("Capture ended before the source opened");
                (None, m.generation)
            } else {
                let Some(capture) = m.capture.take() else {
                    return Err(AudioError::NotCapturing);
                };
                m.state = AudioState::Finalizing;
                (Some(capture), m.generation)
            }
        };

        let (payload, dropped) = match capture {
            Some(capture) => drain(capture).await,
            None => (Vec::new(), 0),
        };
        let encoded = codec::encode(&payload);

        let sent = if self.inner.connection.is_joined() {
            let message = AudioSendPayload {
                room_token: self.inner.connection.room_token().to_string(),
                encoded_audio: encoded.clone(),
            };
            self.inner
                .connection
                .send_payload(events::AUDIO_SEND, &message)
        } else {
            debug!("Not joined, clip kept locally");
            false
        };

        let clip = self
            .inner
            .log
            .push_audio(AudioClip::new(Origin::Local, payload, encoded));
        info!(bytes = clip.len(), dropped, sent, "Clip finalized");

        self.settle(generation, sent);
        Ok(Some(clip))
    }

    /// Leave `Finalizing`, through `Sent` when the clip went out.
    fn settle(&self, generation: u64, sent: bool) {
        let mut m = self.inner.lock();
        if m.generation != generation || m.state != AudioState::Finalizing {
            return;
        }
        let indicator = self.inner.config.sent_indicator;
        if !sent || indicator.is_zero() {
            m.state = AudioState::Idle;
            return;
        }

        m.state = AudioState::Sent;
        let inner = Arc::clone(&self.inner);
        m.sent_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(indicator).await;
            let mut m = inner.lock();
            if m.generation == generation && m.state == AudioState::Sent {
                m.state = AudioState::Idle;
            }
        }));
    }

    /// Hold-to-talk: pressed.
    pub async fn press(&self) -> Result<(), AudioError> {
        self.begin_capture().await
    }

    /// Hold-to-talk: released, inside or outside the target.
    pub async fn release(&self) -> Result<Option<AudioClip>, AudioError> {
        self.end_capture().await
    }

    /// Hold-to-talk: pointer left the target while pressed. Same as release.
    pub async fn pointer_left(&self) -> Result<Option<AudioClip>, AudioError> {
        self.release().await
    }

    /// Tap-to-talk: begin when idle, end when capturing.
    pub async fn toggle(&self) -> Result<Option<AudioClip>, AudioError> {
        let state = self.state();
        match state {
            AudioState::Idle | AudioState::Sent => self.begin_capture().await.map(|()| None),
            AudioState::Capturing => self.end_capture().await,
            AudioState::Finalizing => Err(AudioError::Busy(state)),
        }
    }

    /// Drop any capture without producing a clip and release the source.
    pub fn abort(&self) {
        let capture = {
            let mut m = self.inner.lock();
            m.generation += 1;
            if let Some(timer) = m.sent_timer.take() {
                timer.abort();
            }
            m.state = AudioState::Idle;
            m.acquiring = false;
            m.capture.take()
        };
        if let Some(Capture {
            mut control, pump, ..
        }) = capture
        {
            control.stop();
            pump.abort();
            info!("Capture aborted");
        }
    }

    /// Append a clip received from the room. Never played here.
    pub fn receive_remote(&self, payload: &AudioReceivePayload) -> Option<AudioClip> {
        match codec::decode(&payload.encoded_audio) {
            Ok(bytes) => {
                let clip = self.inner.log.push_audio(AudioClip::new(
                    Origin::Remote,
                    bytes,
                    payload.encoded_audio.clone(),
                ));
                debug!(bytes = clip.len(), "Remote clip received");
                Some(clip)
            }
            Err(e) => {
                warn!(error = %e, "Undecodable remote clip ignored");
                None
            }
        }
    }
}

/// Stop the source, wait for its last chunks and concatenate them.
async fn drain(capture: Capture) -> (Vec<u8>, usize) {
    let Capture {
        mut control,
        pump,
        buffer,
    } = capture;
    control.stop();
    let pump_abort = pump.abort_handle();
    if tokio::time::timeout(DRAIN_TIMEOUT, pump).await.is_err() {
        warn!("Audio source did not stop in time, truncating clip");
        pump_abort.abort();
    }

    let mut buf = buffer.lock().unwrap_or_else(PoisonError::into_inner);
    let chunks = std::mem::take(&mut buf.chunks);
    (chunks.concat(), buf.dropped)
}

async fn pump_chunks(
    mut chunks: mpsc::Receiver<Vec<u8>>,
    buffer: Arc<Mutex<ChunkBuffer>>,
    max_bytes: usize,
) {
    while let Some(chunk) = chunks.recv().await {
        buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(chunk, max_bytes);
    }
}
