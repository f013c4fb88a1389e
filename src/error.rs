use thiserror::Error;

/// Errors produced by the voice session and its subsystems.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoiceError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no audio input device available")]
    DeviceUnavailable,

    #[error("audio capture failed: {0}")]
    Capture(String),

    #[error("failed to open live session: {0}")]
    TransportOpenFailed(String),

    #[error("live session transport error: {0}")]
    Transport(String),

    #[error("malformed audio payload: {0}")]
    Decode(String),

    #[error("live session closed by remote")]
    RemoteClosed,

    #[error("audio playback failed: {0}")]
    Playback(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
