// Microphone capture via cpal.
//
// cpal streams are not Send, so the stream lives on a dedicated thread for
// its whole lifetime, shut down through a shared flag. The device callback
// reframes whatever the hardware delivers into fixed-size mono frames at the
// target rate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::capture::CaptureBackend;
use super::encode;
use super::frame::{AudioFrame, CaptureConfig, FrameAssembler};
use crate::error::VoiceError;

/// Frames buffered toward the session before new ones are dropped.
const FRAME_QUEUE_DEPTH: usize = 32;

/// Microphone capture backend (cpal default input device)
pub struct MicrophoneBackend {
    config: CaptureConfig,
    stop_flag: Option<Arc<AtomicBool>>,
    thread: Option<std::thread::JoinHandle<()>>,
    capturing: bool,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop_flag: None,
            thread: None,
            capturing: false,
        }
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        // A dropped backend must not leave the device thread running.
        if let Some(stop_flag) = self.stop_flag.take() {
            stop_flag.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError> {
        if self.capturing {
            return Err(VoiceError::Capture("already capturing".to_string()));
        }

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = oneshot::channel();
        let stop_flag = Arc::new(AtomicBool::new(false));

        let config = self.config.clone();
        let thread_stop = Arc::clone(&stop_flag);
        let thread = std::thread::Builder::new()
            .name("campus-voice-capture".to_string())
            .spawn(move || run_capture_thread(config, frame_tx, ready_tx, thread_stop))
            .map_err(|e| VoiceError::Capture(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(VoiceError::Capture(
                    "capture thread exited before reporting readiness".to_string(),
                ));
            }
        }

        self.stop_flag = Some(stop_flag);
        self.thread = Some(thread);
        self.capturing = true;

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<(), VoiceError> {
        if !self.capturing {
            return Ok(());
        }
        self.capturing = false;

        if let Some(stop_flag) = self.stop_flag.take() {
            stop_flag.store(true, Ordering::SeqCst);
        }
        if let Some(thread) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }

        info!("microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Per-callback state: reframing plus non-blocking delivery to the session.
struct CallbackState {
    assembler: FrameAssembler,
    frame_tx: mpsc::Sender<AudioFrame>,
    sample_rate: u32,
    emitted_samples: u64,
    dropped: u64,
}

impl CallbackState {
    fn ingest(&mut self, data: &[i16]) {
        for samples in self.assembler.push(data) {
            let timestamp_ms = self.emitted_samples * 1000 / self.sample_rate as u64;
            self.emitted_samples += samples.len() as u64;

            let frame = AudioFrame {
                samples,
                sample_rate: self.sample_rate,
                channels: 1,
                timestamp_ms,
            };

            // The device callback must never block on the session.
            if self.frame_tx.try_send(frame).is_err() {
                self.dropped += 1;
                if self.dropped % 16 == 1 {
                    warn!(
                        "capture queue full, {} frames dropped so far",
                        self.dropped
                    );
                }
            }
        }
    }
}

fn run_capture_thread(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<(), VoiceError>>,
    stop_flag: Arc<AtomicBool>,
) {
    let host = cpal::default_host();
    let device = match host.default_input_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err(VoiceError::DeviceUnavailable));
            return;
        }
    };

    let device_config = match device.default_input_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(map_config_error(e)));
            return;
        }
    };

    let sample_format = device_config.sample_format();
    let stream_config: cpal::StreamConfig = device_config.into();

    let state = CallbackState {
        assembler: FrameAssembler::new(
            stream_config.sample_rate.0,
            stream_config.channels,
            config.sample_rate,
            config.frame_samples,
        ),
        frame_tx,
        sample_rate: config.sample_rate,
        emitted_samples: 0,
        dropped: 0,
    };

    let err_fn = |e| warn!("capture stream error: {e}");

    let stream = match sample_format {
        SampleFormat::F32 => {
            let mut state = state;
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    state.ingest(&encode::f32_to_i16(data));
                },
                err_fn,
                None,
            )
        }
        SampleFormat::I16 => {
            let mut state = state;
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    state.ingest(data);
                },
                err_fn,
                None,
            )
        }
        other => {
            let _ = ready_tx.send(Err(VoiceError::Capture(format!(
                "unsupported input sample format: {other:?}"
            ))));
            return;
        }
    };

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(map_build_error(e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(VoiceError::Capture(e.to_string())));
        return;
    }

    info!(
        "microphone capture running ({}Hz, {} channels at device)",
        stream_config.sample_rate.0, stream_config.channels
    );
    let _ = ready_tx.send(Ok(()));

    while !stop_flag.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
    debug!("microphone capture thread exiting");
}

fn map_config_error(err: cpal::DefaultStreamConfigError) -> VoiceError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => VoiceError::DeviceUnavailable,
        cpal::DefaultStreamConfigError::BackendSpecific { err } => classify_backend(err.to_string()),
        other => VoiceError::Capture(other.to_string()),
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> VoiceError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => VoiceError::DeviceUnavailable,
        cpal::BuildStreamError::BackendSpecific { err } => classify_backend(err.to_string()),
        other => VoiceError::Capture(other.to_string()),
    }
}

// The OS reports microphone-privacy refusals as backend-specific errors, so
// distinguishing them from other failures comes down to the message.
fn classify_backend(message: String) -> VoiceError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("denied") {
        VoiceError::PermissionDenied
    } else {
        VoiceError::Capture(message)
    }
}
