//! In-memory device and relay doubles shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

use crate::audio::{AudioSource, AudioSourceError, CaptureControl, CaptureStream};
use crate::connection::{ConnectionManager, LinkState};
use crate::location::{LocationError, PositionSample, PositionSource, PositionStream};
use crate::protocol::RelayFrame;
use crate::transport::{Connector, RelayLink, TransportError};

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

enum LinkInput {
    Frame(RelayFrame),
    Drop,
}

#[derive(Default)]
struct RelayState {
    sent: Mutex<Vec<RelayFrame>>,
    attempts: Mutex<Vec<Instant>>,
    fail_next: AtomicUsize,
    refuse_all: AtomicBool,
    hang: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    link: Mutex<Option<mpsc::UnboundedSender<LinkInput>>>,
}

/// Relay double: records outbound frames, injects inbound ones and drops.
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    state: Arc<RelayState>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sent(&self) -> Vec<RelayFrame> {
        self.state.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_events(&self, event: &str) -> Vec<RelayFrame> {
        self.sent().into_iter().filter(|f| f.event == event).collect()
    }

    pub(crate) fn attempts(&self) -> usize {
        self.state.attempts.lock().unwrap().len()
    }

    pub(crate) fn attempt_times(&self) -> Vec<Instant> {
        self.state.attempts.lock().unwrap().clone()
    }

    /// Fail the next `n` connection attempts.
    pub(crate) fn fail_next(&self, n: usize) {
        self.state.fail_next.store(n, Ordering::SeqCst);
    }

    pub(crate) fn refuse_all(&self, refuse: bool) {
        self.state.refuse_all.store(refuse, Ordering::SeqCst);
    }

    /// Connection attempts never complete.
    pub(crate) fn hang(&self, hang: bool) {
        self.state.hang.store(hang, Ordering::SeqCst);
    }

    /// Hold every attempt until the returned gate is notified.
    pub(crate) fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.state.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Push an inbound frame onto the live link.
    pub(crate) fn deliver(&self, frame: RelayFrame) -> bool {
        match self.state.link.lock().unwrap().as_ref() {
            Some(tx) => tx.send(LinkInput::Frame(frame)).is_ok(),
            None => false,
        }
    }

    /// Simulate the relay dropping the live link.
    pub(crate) fn drop_link(&self) -> bool {
        match self.state.link.lock().unwrap().take() {
            Some(tx) => tx.send(LinkInput::Drop).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn RelayLink>, TransportError> {
        self.state.attempts.lock().unwrap().push(Instant::now());

        let gate = self.state.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.state.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.state.refuse_all.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("refused".into()));
        }
        let pending = self.state.fail_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.state.fail_next.store(pending - 1, Ordering::SeqCst);
            return Err(TransportError::Connect("refused".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.state.link.lock().unwrap() = Some(tx);
        Ok(Box::new(MockLink {
            state: Arc::clone(&self.state),
            inbound: rx,
        }))
    }
}

struct MockLink {
    state: Arc<RelayState>,
    inbound: mpsc::UnboundedReceiver<LinkInput>,
}

#[async_trait]
impl RelayLink for MockLink {
    async fn send(&mut self, frame: RelayFrame) -> Result<(), TransportError> {
        self.state.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<RelayFrame, TransportError>> {
        match self.inbound.recv().await {
            Some(LinkInput::Frame(frame)) => Some(Ok(frame)),
            Some(LinkInput::Drop) | None => None,
        }
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

pub(crate) fn sample(latitude: f64, longitude: f64) -> PositionSample {
    PositionSample {
        latitude,
        longitude,
        captured_at: Utc::now(),
    }
}

pub(crate) struct MockPositionSource {
    current: Mutex<Result<PositionSample, LocationError>>,
    watcher: Mutex<Option<mpsc::Sender<Result<PositionSample, LocationError>>>>,
    deny_watch: AtomicBool,
    requests: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl MockPositionSource {
    pub(crate) fn new(current: PositionSample) -> Self {
        Self {
            current: Mutex::new(Ok(current)),
            watcher: Mutex::new(None),
            deny_watch: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
            gate: Mutex::new(None),
        }
    }

    /// Hold one-shot requests until the returned gate is notified.
    pub(crate) fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub(crate) fn set_current(&self, result: Result<PositionSample, LocationError>) {
        *self.current.lock().unwrap() = result;
    }

    pub(crate) fn deny_watch(&self) {
        self.deny_watch.store(true, Ordering::SeqCst);
    }

    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub(crate) fn is_watched(&self) -> bool {
        self.watcher
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Emit a sample on the live watch stream.
    pub(crate) async fn push(&self, item: Result<PositionSample, LocationError>) -> bool {
        let tx = self.watcher.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.send(item).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl PositionSource for MockPositionSource {
    async fn current_position(&self) -> Result<PositionSample, LocationError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.current.lock().unwrap().clone()
    }

    async fn watch_position(&self) -> Result<PositionStream, LocationError> {
        if self.deny_watch.load(Ordering::SeqCst) {
            return Err(LocationError::PermissionDenied);
        }
        let (tx, rx) = mpsc::channel(16);
        *self.watcher.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

type ChunkSlot = Arc<Mutex<Option<mpsc::Sender<Vec<u8>>>>>;

#[derive(Default)]
pub(crate) struct MockAudioSource {
    deny: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    chunks: ChunkSlot,
    starts: AtomicUsize,
    stops: Arc<AtomicUsize>,
}

impl MockAudioSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Hold acquisition until the returned gate is notified.
    pub(crate) fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub(crate) fn is_open(&self) -> bool {
        self.chunks.lock().unwrap().is_some()
    }

    /// Emit a raw chunk from the open capture.
    pub(crate) async fn emit(&self, chunk: &[u8]) -> bool {
        let tx = self.chunks.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.send(chunk.to_vec()).await.is_ok(),
            None => false,
        }
    }
}

struct MockCaptureControl {
    chunks: ChunkSlot,
    stops: Arc<AtomicUsize>,
}

impl CaptureControl for MockCaptureControl {
    fn stop(&mut self) {
        if self.chunks.lock().unwrap().take().is_some() {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl AudioSource for MockAudioSource {
    async fn start(&self) -> Result<CaptureStream, AudioSourceError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.deny.load(Ordering::SeqCst) {
            return Err(AudioSourceError::PermissionDenied);
        }

        let (tx, rx) = mpsc::channel(64);
        *self.chunks.lock().unwrap() = Some(tx);
        Ok(CaptureStream {
            chunks: rx,
            control: Box::new(MockCaptureControl {
                chunks: Arc::clone(&self.chunks),
                stops: Arc::clone(&self.stops),
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Wait until the manager reaches `state`, failing after a generous bound.
pub(crate) async fn wait_for_state(manager: &ConnectionManager, state: LinkState) {
    let mut rx = manager.watch_link_state();
    tokio::time::timeout(Duration::from_secs(60), rx.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {state:?}"))
        .unwrap_or_else(|_| panic!("connection task gone while waiting for {state:?}"));
}

/// Poll `cond` until it holds, yielding to other tasks in between.
pub(crate) async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(120);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
