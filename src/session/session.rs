use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::VoiceSessionConfig;
use super::stats::SessionStatus;
use crate::audio::{
    encode, AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
};
use crate::error::VoiceError;
use crate::live::{GeminiLiveTransport, LiveClientConfig, LiveEvent, LiveTransport};
use crate::playback::{DeviceSink, OutputClock, PlaybackScheduler, PlaybackSink};
use crate::transcript::{TranscriptAggregator, TranscriptSnapshot};

/// Session lifecycle.
///
/// ```text
/// idle → connecting → active → idle      (clean stop / remote close)
///            ↓           ↓
///          error ←───────┘               (device or transport failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecycle {
    Idle,
    Connecting,
    Active,
    Closing,
    Error,
}

impl SessionLifecycle {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// A session that is connecting, streaming, or winding down. A second
    /// `start()` is refused while busy.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Connecting | Self::Active | Self::Closing)
    }
}

/// Everything the spawned tasks share with the session handle.
struct Shared {
    session_id: String,
    lifecycle: Mutex<SessionLifecycle>,
    last_error: Mutex<Option<String>>,
    started_at: Mutex<Option<DateTime<Utc>>>,
    transcripts: TranscriptAggregator,
    scheduler: PlaybackScheduler,
    capture: Mutex<Box<dyn CaptureBackend>>,
    transport: Mutex<Box<dyn LiveTransport>>,
    pump_task: Mutex<Option<JoinHandle<()>>>,
    frames_sent: AtomicUsize,
    chunks_scheduled: AtomicUsize,
}

/// A voice session that manages microphone capture, the live bidirectional
/// connection, gapless playback of model audio, and live transcripts.
///
/// At most one session should be open at a time; the HTTP layer enforces
/// that with its single session slot.
pub struct VoiceSession {
    config: VoiceSessionConfig,
    shared: Arc<Shared>,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl VoiceSession {
    /// Build a session against the real microphone, live endpoint, and
    /// speaker output.
    pub fn new(config: VoiceSessionConfig) -> Result<Self, VoiceError> {
        let capture = CaptureBackendFactory::create(
            CaptureSource::Microphone,
            CaptureConfig {
                sample_rate: config.input_sample_rate,
                channels: 1,
                frame_samples: config.frame_samples,
            },
        )?;

        let transport = Box::new(GeminiLiveTransport::new(LiveClientConfig {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }));

        let sink = DeviceSink::new()?;
        let clock = sink.clock();

        Ok(Self::with_parts(
            config,
            capture,
            transport,
            Arc::new(sink),
            clock,
        ))
    }

    /// Build a session from explicit parts (alternate capture sources,
    /// tests).
    pub fn with_parts(
        config: VoiceSessionConfig,
        capture: Box<dyn CaptureBackend>,
        transport: Box<dyn LiveTransport>,
        sink: Arc<dyn PlaybackSink>,
        clock: Arc<dyn OutputClock>,
    ) -> Self {
        let scheduler = PlaybackScheduler::new(clock, sink, config.output_sample_rate);

        let shared = Arc::new(Shared {
            session_id: config.session_id.clone(),
            lifecycle: Mutex::new(SessionLifecycle::Idle),
            last_error: Mutex::new(None),
            started_at: Mutex::new(None),
            transcripts: TranscriptAggregator::new(),
            scheduler,
            capture: Mutex::new(capture),
            transport: Mutex::new(transport),
            pump_task: Mutex::new(None),
            frames_sent: AtomicUsize::new(0),
            chunks_scheduled: AtomicUsize::new(0),
        });

        Self {
            config,
            shared,
            event_task: Mutex::new(None),
        }
    }

    /// Start the session: acquire the microphone, open the live connection,
    /// and begin streaming once the server confirms setup.
    ///
    /// A no-op when the session is already connecting or active.
    pub async fn start(&self) -> Result<(), VoiceError> {
        {
            let mut lifecycle = self.shared.lifecycle.lock().await;
            if lifecycle.is_busy() {
                warn!(session_id = %self.shared.session_id, "voice session already running");
                return Ok(());
            }
            *lifecycle = SessionLifecycle::Connecting;
        }

        *self.shared.last_error.lock().await = None;
        *self.shared.started_at.lock().await = Some(Utc::now());
        self.shared.frames_sent.store(0, Ordering::Relaxed);
        self.shared.chunks_scheduled.store(0, Ordering::Relaxed);

        info!(session_id = %self.shared.session_id, "starting voice session");

        // Acquire the microphone first so permission problems surface
        // before we touch the network.
        let frame_rx = {
            let mut capture = self.shared.capture.lock().await;
            capture.start().await
        };
        let frame_rx = match frame_rx {
            Ok(rx) => rx,
            Err(e) => {
                self.shared.fail(e.to_string()).await;
                return Err(e);
            }
        };

        let events = {
            let mut transport = self.shared.transport.lock().await;
            transport.open(self.config.setup()).await
        };
        let events = match events {
            Ok(events) => events,
            Err(e) => {
                let _ = self.shared.capture.lock().await.stop().await;
                self.shared.fail(e.to_string()).await;
                return Err(e);
            }
        };

        let task = tokio::spawn(run_event_loop(Arc::clone(&self.shared), events, frame_rx));
        *self.event_task.lock().await = Some(task);

        Ok(())
    }

    /// Stop the session and release every resource. Idempotent: safe from
    /// any state, and no capture/inbound/playback callback has an
    /// observable effect after it returns.
    pub async fn stop(&self) -> SessionStatus {
        let was_running = {
            let mut lifecycle = self.shared.lifecycle.lock().await;
            if lifecycle.is_busy() {
                *lifecycle = SessionLifecycle::Closing;
                true
            } else {
                false
            }
        };

        if was_running {
            info!(session_id = %self.shared.session_id, "stopping voice session");

            // Stop feeding the transport before the devices go away.
            if let Some(pump) = self.shared.pump_task.lock().await.take() {
                pump.abort();
                let _ = pump.await;
            }
            if let Err(e) = self.shared.capture.lock().await.stop().await {
                warn!(session_id = %self.shared.session_id, "failed to stop capture: {e}");
            }
            if let Err(e) = self.shared.transport.lock().await.close().await {
                warn!(session_id = %self.shared.session_id, "failed to close transport: {e}");
            }

            // Closing the transport ends the event stream; wait for the
            // loop so no handler outlives this call.
            if let Some(task) = self.event_task.lock().await.take() {
                let _ = task.await;
            }

            self.shared.scheduler.interrupt();
            self.shared.transcripts.clear().await;
            *self.shared.lifecycle.lock().await = SessionLifecycle::Idle;
        } else if let Some(task) = self.event_task.lock().await.take() {
            // The session already wound down on its own; reap the loop task.
            let _ = task.await;
        }

        self.status().await
    }

    /// Current observable state for the UI.
    pub async fn status(&self) -> SessionStatus {
        let lifecycle = *self.shared.lifecycle.lock().await;
        let started_at = *self.shared.started_at.lock().await;
        let snapshot = self.shared.transcripts.snapshot().await;

        SessionStatus {
            session_id: self.shared.session_id.clone(),
            is_active: lifecycle == SessionLifecycle::Active,
            is_connecting: lifecycle == SessionLifecycle::Connecting,
            error: self.shared.last_error.lock().await.clone(),
            started_at,
            duration_secs: started_at
                .map(|t| (Utc::now() - t).num_milliseconds() as f64 / 1000.0)
                .unwrap_or(0.0),
            frames_sent: self.shared.frames_sent.load(Ordering::Relaxed),
            chunks_scheduled: self.shared.chunks_scheduled.load(Ordering::Relaxed),
            active_playback_units: self.shared.scheduler.active_units(),
            user_transcript: snapshot.user,
            assistant_transcript: snapshot.assistant,
        }
    }

    /// Current transcript buffers.
    pub async fn transcript(&self) -> TranscriptSnapshot {
        self.shared.transcripts.snapshot().await
    }

    pub async fn lifecycle(&self) -> SessionLifecycle {
        *self.shared.lifecycle.lock().await
    }

    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    pub fn config(&self) -> &VoiceSessionConfig {
        &self.config
    }
}

impl Shared {
    async fn fail(&self, message: String) {
        error!(session_id = %self.session_id, "voice session failed: {message}");
        *self.last_error.lock().await = Some(message);
        *self.lifecycle.lock().await = SessionLifecycle::Error;
    }

    /// Release everything, from the event loop's side. `stop()` may run the
    /// same steps concurrently; every one of them is idempotent.
    async fn teardown(&self, failure: Option<String>) {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            if matches!(*lifecycle, SessionLifecycle::Idle | SessionLifecycle::Error) {
                return;
            }
            *lifecycle = SessionLifecycle::Closing;
        }

        if let Some(pump) = self.pump_task.lock().await.take() {
            pump.abort();
            let _ = pump.await;
        }
        if let Err(e) = self.capture.lock().await.stop().await {
            warn!(session_id = %self.session_id, "failed to stop capture: {e}");
        }
        if let Err(e) = self.transport.lock().await.close().await {
            warn!(session_id = %self.session_id, "failed to close transport: {e}");
        }
        self.scheduler.interrupt();
        self.transcripts.clear().await;

        if let Some(message) = &failure {
            error!(session_id = %self.session_id, "voice session failed: {message}");
            *self.last_error.lock().await = Some(message.clone());
        }
        *self.lifecycle.lock().await = if failure.is_some() {
            SessionLifecycle::Error
        } else {
            SessionLifecycle::Idle
        };
    }
}

/// Routes inbound events: transcripts to the aggregator, audio to the
/// scheduler, lifecycle signals to teardown. Runs until the event stream
/// ends.
async fn run_event_loop(
    shared: Arc<Shared>,
    mut events: mpsc::Receiver<LiveEvent>,
    frame_rx: mpsc::Receiver<AudioFrame>,
) {
    let mut frame_rx = Some(frame_rx);

    while let Some(event) = events.recv().await {
        match event {
            LiveEvent::Ready => {
                {
                    let mut lifecycle = shared.lifecycle.lock().await;
                    if *lifecycle != SessionLifecycle::Connecting {
                        // stop() won the race; leave the teardown alone.
                        continue;
                    }
                    *lifecycle = SessionLifecycle::Active;
                }
                info!(session_id = %shared.session_id, "live session ready, streaming microphone");
                if let Some(rx) = frame_rx.take() {
                    let pump = tokio::spawn(run_frame_pump(Arc::clone(&shared), rx));
                    *shared.pump_task.lock().await = Some(pump);
                }
            }
            LiveEvent::OutputTranscript { text } => {
                shared.transcripts.append_assistant(&text).await;
            }
            LiveEvent::InputTranscript { text } => {
                shared.transcripts.append_user(&text).await;
            }
            LiveEvent::TurnComplete => {
                debug!(session_id = %shared.session_id, "turn complete");
                shared.transcripts.clear().await;
            }
            LiveEvent::Audio { data } => {
                shared.scheduler.enqueue(data);
                shared.chunks_scheduled.fetch_add(1, Ordering::Relaxed);
            }
            LiveEvent::Interrupted => {
                // Barge-in halts audio only; the transcripts keep their turn.
                shared.scheduler.interrupt();
            }
            LiveEvent::Error { message } => {
                shared.teardown(Some(message)).await;
                return;
            }
            LiveEvent::Closed { reason } => {
                info!(session_id = %shared.session_id, ?reason, "live session closed by remote");
                shared.teardown(None).await;
                return;
            }
        }
    }

    // Event stream ended without an explicit close: same teardown path.
    shared.teardown(None).await;
}

/// Encodes captured frames and queues them on the transport. Sends are
/// fire-and-forget so a slow network can never stall capture.
async fn run_frame_pump(shared: Arc<Shared>, mut frame_rx: mpsc::Receiver<AudioFrame>) {
    // Frames captured while the session was still connecting are stale by
    // the time the model is ready; skip straight to live audio.
    let mut skipped = 0usize;
    while frame_rx.try_recv().is_ok() {
        skipped += 1;
    }
    if skipped > 0 {
        debug!(session_id = %shared.session_id, skipped, "discarded frames captured before readiness");
    }

    while let Some(frame) = frame_rx.recv().await {
        let media = encode::frame_to_media(&frame);
        let queued = { shared.transport.lock().await.send(media) };
        match queued {
            Ok(()) => {
                shared.frames_sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(session_id = %shared.session_id, "failed to queue frame: {e}");
            }
        }
    }

    debug!(session_id = %shared.session_id, "frame pump exiting");
}
