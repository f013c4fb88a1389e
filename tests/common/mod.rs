// Scripted doubles for driving a voice session without devices or network:
// a manually advanced output clock, a recording playback sink, and scripted
// capture/transport backends.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use campus_voice::{
    AudioFrame, CaptureBackend, LiveEvent, LiveTransport, MediaBlob, OutputClock, PlaybackSink,
    PlaybackUnit, SessionSetup, VoiceError, VoiceSession, VoiceSessionConfig,
};
use tokio::sync::mpsc;

// ============================================================================
// Clock
// ============================================================================

/// Output clock advanced by hand.
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(0.0),
        })
    }

    pub fn set(&self, t: f64) {
        *self.now.lock().unwrap() = t;
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock().unwrap() += secs;
    }
}

impl OutputClock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap()
    }
}

// ============================================================================
// Sink
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BegunUnit {
    pub id: u64,
    pub start_at: f64,
    pub duration: f64,
    pub samples: usize,
}

/// Playback sink that records every begin/halt and lets tests trigger
/// natural completions.
#[derive(Default)]
pub struct RecordingSink {
    begun: Mutex<Vec<BegunUnit>>,
    halted: Mutex<Vec<u64>>,
    done: Mutex<HashMap<u64, mpsc::UnboundedSender<u64>>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn begun(&self) -> Vec<BegunUnit> {
        self.begun.lock().unwrap().clone()
    }

    pub fn halted(&self) -> Vec<u64> {
        self.halted.lock().unwrap().clone()
    }

    /// Simulate a unit finishing naturally.
    pub fn complete(&self, id: u64) {
        if let Some(tx) = self.done.lock().unwrap().remove(&id) {
            let _ = tx.send(id);
        }
    }
}

impl PlaybackSink for RecordingSink {
    fn begin(&self, unit: PlaybackUnit, done: mpsc::UnboundedSender<u64>) {
        self.begun.lock().unwrap().push(BegunUnit {
            id: unit.id,
            start_at: unit.start_at,
            duration: unit.duration_secs(),
            samples: unit.samples.len(),
        });
        self.done.lock().unwrap().insert(unit.id, done);
    }

    fn halt(&self, id: u64) {
        self.halted.lock().unwrap().push(id);
        self.done.lock().unwrap().remove(&id);
    }
}

// ============================================================================
// Capture
// ============================================================================

#[derive(Default)]
struct CaptureShared {
    frame_tx: Mutex<Option<mpsc::Sender<AudioFrame>>>,
    starts: AtomicUsize,
    releases: AtomicUsize,
}

/// Capture backend fed by the test instead of a device.
pub struct ScriptedCapture {
    shared: Arc<CaptureShared>,
    capturing: bool,
}

#[derive(Clone)]
pub struct CaptureHandle {
    shared: Arc<CaptureShared>,
}

impl ScriptedCapture {
    pub fn new() -> (Self, CaptureHandle) {
        let shared = Arc::new(CaptureShared::default());
        (
            Self {
                shared: Arc::clone(&shared),
                capturing: false,
            },
            CaptureHandle { shared },
        )
    }
}

impl CaptureHandle {
    /// Deliver one captured frame, as if a device callback fired.
    pub async fn push_frame(&self, samples: Vec<i16>) {
        let tx = self.shared.frame_tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx
                .send(AudioFrame {
                    samples,
                    sample_rate: 16000,
                    channels: 1,
                    timestamp_ms: 0,
                })
                .await;
        }
    }

    pub fn start_count(&self) -> usize {
        self.shared.starts.load(Ordering::SeqCst)
    }

    /// How many times the device was actually released.
    pub fn release_count(&self) -> usize {
        self.shared.releases.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError> {
        let (tx, rx) = mpsc::channel(64);
        *self.shared.frame_tx.lock().unwrap() = Some(tx);
        self.shared.starts.fetch_add(1, Ordering::SeqCst);
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), VoiceError> {
        if !self.capturing {
            return Ok(());
        }
        self.capturing = false;
        *self.shared.frame_tx.lock().unwrap() = None;
        self.shared.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Default)]
struct TransportShared {
    event_tx: Mutex<Option<mpsc::Sender<LiveEvent>>>,
    sent: Mutex<Vec<MediaBlob>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    setup: Mutex<Option<SessionSetup>>,
    open: AtomicBool,
}

/// Transport driven by the test instead of a socket.
pub struct ScriptedTransport {
    shared: Arc<TransportShared>,
}

#[derive(Clone)]
pub struct TransportHandle {
    shared: Arc<TransportShared>,
}

impl ScriptedTransport {
    pub fn new() -> (Self, TransportHandle) {
        let shared = Arc::new(TransportShared::default());
        (
            Self {
                shared: Arc::clone(&shared),
            },
            TransportHandle { shared },
        )
    }
}

impl TransportHandle {
    /// Deliver one inbound event, as if it arrived from the remote.
    pub async fn emit(&self, event: LiveEvent) {
        let tx = self.shared.event_tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    /// Frames the session queued for sending, in order.
    pub fn sent(&self) -> Vec<MediaBlob> {
        self.shared.sent.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    pub fn last_setup(&self) -> Option<SessionSetup> {
        self.shared.setup.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LiveTransport for ScriptedTransport {
    async fn open(
        &mut self,
        setup: SessionSetup,
    ) -> Result<mpsc::Receiver<LiveEvent>, VoiceError> {
        let (tx, rx) = mpsc::channel(64);
        *self.shared.event_tx.lock().unwrap() = Some(tx);
        *self.shared.setup.lock().unwrap() = Some(setup);
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        self.shared.open.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    fn send(&self, media: MediaBlob) -> Result<(), VoiceError> {
        if !self.shared.open.load(Ordering::SeqCst) {
            return Err(VoiceError::Transport("session not open".to_string()));
        }
        self.shared.sent.lock().unwrap().push(media);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), VoiceError> {
        if self.shared.open.swap(false, Ordering::SeqCst) {
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
        }
        // Ending the event stream is part of the close contract.
        *self.shared.event_tx.lock().unwrap() = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// A session wired to scripted doubles.
pub fn scripted_session() -> (
    VoiceSession,
    CaptureHandle,
    TransportHandle,
    Arc<RecordingSink>,
    Arc<ManualClock>,
) {
    let (capture, capture_handle) = ScriptedCapture::new();
    let (transport, transport_handle) = ScriptedTransport::new();
    let sink = RecordingSink::new();
    let clock = ManualClock::new();

    let session = VoiceSession::with_parts(
        VoiceSessionConfig::default(),
        Box::new(capture),
        Box::new(transport),
        Arc::clone(&sink) as Arc<dyn PlaybackSink>,
        Arc::clone(&clock) as Arc<dyn OutputClock>,
    );

    (session, capture_handle, transport_handle, sink, clock)
}

/// Base64 payload of `samples` zero-valued 16-bit PCM samples.
pub fn pcm_chunk(samples: usize) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(vec![0u8; samples * 2])
}

/// Poll until `predicate` holds or a second has passed.
pub async fn wait_for(mut predicate: impl FnMut() -> bool, what: &str) {
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
