use std::path::PathBuf;

use tokio::sync::mpsc;

use super::frame::{AudioFrame, CaptureConfig};
use crate::error::VoiceError;

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal default input device (all platforms)
/// - File: replay a WAV file at real-time pace (demos/offline runs)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Acquires the underlying device and returns a channel receiver that
    /// will receive audio frames. Fails with `PermissionDenied` or
    /// `DeviceUnavailable` when the platform refuses or lacks an input.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError>;

    /// Stop capturing audio and release the device
    ///
    /// Idempotent: calling it when already stopped is a no-op. No frame is
    /// delivered after it returns.
    async fn stop(&mut self) -> Result<(), VoiceError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Microphone input
    Microphone,
    /// WAV file input (for demos/offline runs)
    File(PathBuf),
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    /// Create a capture backend for the given source
    pub fn create(
        source: CaptureSource,
        config: CaptureConfig,
    ) -> Result<Box<dyn CaptureBackend>, VoiceError> {
        match source {
            CaptureSource::Microphone => {
                let backend = super::microphone::MicrophoneBackend::new(config);
                Ok(Box::new(backend))
            }
            CaptureSource::File(path) => {
                let backend = super::file::FileBackend::new(path, config);
                Ok(Box::new(backend))
            }
        }
    }
}
