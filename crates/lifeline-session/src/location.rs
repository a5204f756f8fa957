//! Position reporting.
//!
//! Samples come from a [`PositionSource`], either as a live stream
//! (continuous mode) or one at a time (one-shot). Only the latest sample is
//! kept. Nothing is sent unless the link is joined; how often samples are
//! forwarded is governed by [`LocationPolicy`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::connection::ConnectionManager;
use crate::protocol::{events, LocationUpdatePayload};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Live sample stream. Ends when the source stops.
pub type PositionStream = mpsc::Receiver<Result<PositionSample, LocationError>>;

/// Device position provider.
#[async_trait]
pub trait PositionSource: Send + Sync + 'static {
    async fn current_position(&self) -> Result<PositionSample, LocationError>;

    async fn watch_position(&self) -> Result<PositionStream, LocationError>;
}

/// Which streamed samples are forwarded while joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationPolicy {
    /// Forward every sample.
    #[default]
    EverySample,
    /// Forward at most one sample per interval.
    Throttled { min_interval: Duration },
    /// Stream only updates the latest sample; it goes out on (re)join and
    /// on explicit one-shot requests.
    OnJoinOnly,
}

#[derive(Debug, Clone, Default)]
pub struct LocationConfig {
    pub policy: LocationPolicy,
    /// Request a silent fix on join when no sample is known yet.
    pub locate_on_join: bool,
}

#[derive(Default)]
struct ReporterState {
    latest: Option<PositionSample>,
    last_error: Option<LocationError>,
    last_sent: Option<Instant>,
    watcher: Option<JoinHandle<()>>,
    /// Silent fix requested on join.
    join_fix: Option<JoinHandle<()>>,
}

struct Inner {
    connection: ConnectionManager,
    source: Arc<dyn PositionSource>,
    config: LocationConfig,
    state: Mutex<ReporterState>,
}

/// Cloneable handle onto one reporter.
#[derive(Clone)]
pub struct LocationReporter {
    inner: Arc<Inner>,
}

impl LocationReporter {
    pub fn new(
        connection: ConnectionManager,
        source: Arc<dyn PositionSource>,
        config: LocationConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                connection,
                source,
                config,
                state: Mutex::new(ReporterState::default()),
            }),
        }
    }

    pub fn latest(&self) -> Option<PositionSample> {
        self.inner.lock().latest
    }

    /// Last source failure; cleared by the next successful sample.
    pub fn last_error(&self) -> Option<LocationError> {
        self.inner.lock().last_error.clone()
    }

    pub fn is_watching(&self) -> bool {
        self.inner
            .lock()
            .watcher
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Subscribe to the live stream. A running watcher is replaced.
    pub async fn start_continuous(&self) -> Result<(), LocationError> {
        let mut stream = match self.inner.source.watch_position().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Position watch failed");
                self.inner.lock().last_error = Some(e.clone());
                return Err(e);
            }
        };

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            while let Some(item) = stream.recv().await {
                match item {
                    Ok(sample) => inner.on_stream_sample(sample),
                    Err(e) => {
                        warn!(error = %e, "Position stream error");
                        inner.lock().last_error = Some(e);
                    }
                }
            }
            debug!("Position stream ended");
        });

        if let Some(old) = self.inner.lock().watcher.replace(handle) {
            old.abort();
        }
        info!(policy = ?self.inner.config.policy, "Continuous location started");
        Ok(())
    }

    /// Request one fix and send it if joined, regardless of the policy.
    ///
    /// `silent` suppresses the user-facing confirmation.
    pub async fn locate_once(&self, silent: bool) -> Result<PositionSample, LocationError> {
        match self.inner.source.current_position().await {
            Ok(sample) => {
                self.inner.store(sample);
                let sent = self.inner.send(&sample);
                if !silent {
                    info!(
                        lat = sample.latitude,
                        lng = sample.longitude,
                        sent,
                        "Location shared"
                    );
                }
                Ok(sample)
            }
            Err(e) => {
                warn!(error = %e, "Position request failed");
                self.inner.lock().last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Called on every (re)join: re-send the latest sample so the other side
    /// is not left stale. Without one, optionally fetch a silent fix.
    pub fn resend_latest(&self) {
        match self.latest() {
            Some(sample) => {
                debug!("Re-sending latest position after join");
                self.inner.send(&sample);
            }
            None if self.inner.config.locate_on_join => {
                let mut state = self.inner.lock();
                if state.join_fix.as_ref().is_some_and(|h| !h.is_finished()) {
                    debug!("Join fix already pending");
                    return;
                }
                let reporter = self.clone();
                state.join_fix = Some(tokio::spawn(async move {
                    let _ = reporter.locate_once(true).await;
                }));
            }
            None => {}
        }
    }

    /// End the live stream and any pending join fix.
    pub fn stop(&self) {
        let (watcher, join_fix) = {
            let mut state = self.inner.lock();
            (state.watcher.take(), state.join_fix.take())
        };
        if let Some(handle) = join_fix {
            handle.abort();
        }
        if let Some(handle) = watcher {
            handle.abort();
            info!("Continuous location stopped");
        }
    }
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, ReporterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, sample: PositionSample) {
        let mut state = self.lock();
        state.latest = Some(sample);
        state.last_error = None;
    }

    fn on_stream_sample(&self, sample: PositionSample) {
        self.store(sample);
        let due = match self.config.policy {
            LocationPolicy::EverySample => true,
            LocationPolicy::OnJoinOnly => false,
            LocationPolicy::Throttled { min_interval } => self
                .lock()
                .last_sent
                .map_or(true, |at| at.elapsed() >= min_interval),
        };
        if due {
            self.send(&sample);
        }
    }

    fn send(&self, sample: &PositionSample) -> bool {
        if !self.connection.is_joined() {
            debug!("Not joined, dropping position");
            return false;
        }
        let payload = LocationUpdatePayload {
            room_token: self.connection.room_token().to_string(),
            lat: sample.latitude,
            lng: sample.longitude,
            captured_at: Some(sample.captured_at.timestamp_millis()),
        };
        let sent = self
            .connection
            .send_payload(events::LOCATION_UPDATE, &payload);
        if sent {
            self.lock().last_sent = Some(Instant::now());
        }
        sent
    }
}
