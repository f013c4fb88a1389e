use std::path::PathBuf;

use hound::WavReader;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::capture::CaptureBackend;
use super::frame::{AudioFrame, CaptureConfig};
use crate::error::VoiceError;

/// WAV file capture backend
///
/// Replays a 16-bit PCM WAV file as capture frames at real-time pace,
/// standing in for the microphone in demos and offline runs.
pub struct FileBackend {
    path: PathBuf,
    config: CaptureConfig,
    task: Option<JoinHandle<()>>,
    stop_tx: Option<watch::Sender<bool>>,
    capturing: bool,
}

impl FileBackend {
    pub fn new(path: PathBuf, config: CaptureConfig) -> Self {
        Self {
            path,
            config,
            task: None,
            stop_tx: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError> {
        if self.capturing {
            return Err(VoiceError::Capture("already capturing".to_string()));
        }

        let reader = WavReader::open(&self.path)
            .map_err(|e| VoiceError::Capture(format!("failed to open WAV file: {e}")))?;

        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(VoiceError::Capture(format!(
                "expected 16-bit PCM WAV, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| VoiceError::Capture(format!("failed to read WAV samples: {e}")))?;

        let samples = stereo_to_mono(samples, spec.channels);
        let samples = decimate(samples, spec.sample_rate, self.config.sample_rate);

        info!(
            "file capture source loaded: {} ({:.1}s at {}Hz)",
            self.path.display(),
            samples.len() as f64 / self.config.sample_rate as f64,
            self.config.sample_rate
        );

        let rate = self.config.sample_rate;
        let frame_samples = self.config.frame_samples;
        let frame_duration =
            std::time::Duration::from_secs_f64(frame_samples as f64 / rate as f64);

        let (frame_tx, frame_rx) = mpsc::channel(4);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(frame_duration);
            let mut timestamp_ms = 0u64;
            for chunk in samples.chunks(frame_samples) {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = interval.tick() => {}
                }
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate: rate,
                    channels: 1,
                    timestamp_ms,
                };
                timestamp_ms += chunk.len() as u64 * 1000 / rate as u64;
                if frame_tx.send(frame).await.is_err() {
                    break;
                }
            }
            debug!("file capture source drained");
        });

        self.task = Some(task);
        self.stop_tx = Some(stop_tx);
        self.capturing = true;

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<(), VoiceError> {
        if !self.capturing {
            return Ok(());
        }
        self.capturing = false;

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Convert interleaved stereo to mono by summing channels (no division, to
/// preserve volume). Other channel counts pass through unchanged.
fn stereo_to_mono(samples: Vec<i16>, channels: u16) -> Vec<i16> {
    if channels != 2 {
        return samples;
    }

    let mut mono = Vec::with_capacity(samples.len() / 2);
    for chunk in samples.chunks_exact(2) {
        let sum = chunk[0] as i32 + chunk[1] as i32;
        mono.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }
    mono
}

/// Downsample by decimation (take every Nth sample). Slower sources pass
/// through; there is no upsampling.
fn decimate(samples: Vec<i16>, from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate <= to_rate {
        return samples;
    }

    let ratio = from_rate / to_rate;
    if ratio <= 1 {
        return samples;
    }

    samples.iter().step_by(ratio as usize).copied().collect()
}
