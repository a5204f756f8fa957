//! Device backends for a headless helper.
//!
//! Position is either a fixed coordinate from the command line or absent.
//! The microphone is either a raw audio file played back in chunks or absent.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lifeline_session::{
    AudioSource, AudioSourceError, CaptureControl, CaptureStream, LocationError,
    PositionSample, PositionSource, PositionStream,
};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

const CHUNK_BYTES: usize = 4096;
const CHUNK_PERIOD: Duration = Duration::from_millis(20);

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Always reports the same coordinate, stamped with the current time.
pub struct FixedPosition {
    latitude: f64,
    longitude: f64,
}

impl FixedPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn sample(&self) -> PositionSample {
        PositionSample {
            latitude: self.latitude,
            longitude: self.longitude,
            captured_at: Utc::now(),
        }
    }
}

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<PositionSample, LocationError> {
        Ok(self.sample())
    }

    async fn watch_position(&self) -> Result<PositionStream, LocationError> {
        let (tx, rx) = mpsc::channel(1);
        let sample = self.sample();
        tokio::spawn(async move {
            if tx.send(Ok(sample)).await.is_ok() {
                // A stationary device: the stream stays open with nothing new.
                tx.closed().await;
            }
        });
        Ok(rx)
    }
}

/// No positioning hardware on this host.
pub struct NoPosition;

#[async_trait]
impl PositionSource for NoPosition {
    async fn current_position(&self) -> Result<PositionSample, LocationError> {
        Err(LocationError::Unavailable("no position configured".into()))
    }

    async fn watch_position(&self) -> Result<PositionStream, LocationError> {
        Err(LocationError::Unavailable("no position configured".into()))
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

/// Plays a file back as microphone input, one chunk per tick.
pub struct FileAudio {
    path: PathBuf,
}

impl FileAudio {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

struct StopSignal(Option<oneshot::Sender<()>>);

impl CaptureControl for StopSignal {
    fn stop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

#[async_trait]
impl AudioSource for FileAudio {
    async fn start(&self) -> Result<CaptureStream, AudioSourceError> {
        let data = tokio::fs::read(&self.path).await.map_err(|e| {
            AudioSourceError::Unavailable(format!("{}: {e}", self.path.display()))
        })?;
        let (chunk_tx, chunk_rx) = mpsc::channel(16);
        let (stop_tx, mut stop_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CHUNK_PERIOD);
            let mut chunks = data.chunks(CHUNK_BYTES);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => match chunks.next() {
                        Some(chunk) => {
                            if chunk_tx.send(chunk.to_vec()).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            // Source exhausted; hold the capture open until stopped.
                            let _ = (&mut stop_rx).await;
                            break;
                        }
                    },
                }
            }
            debug!("File capture closed");
        });

        Ok(CaptureStream {
            chunks: chunk_rx,
            control: Box::new(StopSignal(Some(stop_tx))),
        })
    }
}

/// No microphone on this host.
pub struct NoAudio;

#[async_trait]
impl AudioSource for NoAudio {
    async fn start(&self) -> Result<CaptureStream, AudioSourceError> {
        Err(AudioSourceError::Unavailable(
            "no audio file configured".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_position_streams_one_sample_and_stays_open() {
        let source = FixedPosition::new(51.5, -0.12);
        let mut stream = source.watch_position().await.unwrap();

        let first = stream.recv().await.unwrap().unwrap();
        assert_eq!((first.latitude, first.longitude), (51.5, -0.12));
        let next = tokio::time::timeout(Duration::from_millis(50), stream.recv()).await;
        assert!(next.is_err());
    }

    #[tokio::test]
    async fn missing_devices_report_unavailable() {
        assert!(matches!(
            NoPosition.current_position().await,
            Err(LocationError::Unavailable(_))
        ));
        assert!(matches!(
            NoAudio.start().await,
            Err(AudioSourceError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn file_audio_replays_contents_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.raw");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let CaptureStream {
            mut chunks,
            mut control,
        } = FileAudio::new(&path).start().await.unwrap();

        let mut received = Vec::new();
        while received.len() < data.len() {
            received.extend(chunks.recv().await.unwrap());
        }
        assert_eq!(received, data);

        control.stop();
        control.stop();
        assert!(chunks.recv().await.is_none());
    }

    #[tokio::test]
    async fn unreadable_file_is_unavailable() {
        let err = FileAudio::new("/nonexistent/clip.raw").start().await;
        assert!(matches!(err, Err(AudioSourceError::Unavailable(_))));
    }
}
