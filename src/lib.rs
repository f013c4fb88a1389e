pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod live;
pub mod playback;
pub mod session;
pub mod transcript;

pub use audio::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource, FileBackend,
    FrameAssembler, MicrophoneBackend,
};
pub use config::Config;
pub use error::VoiceError;
pub use http::{create_router, AppState};
pub use live::{
    GeminiLiveTransport, LiveClientConfig, LiveEvent, LiveTransport, MediaBlob, SessionSetup,
};
pub use playback::{DeviceSink, OutputClock, PlaybackScheduler, PlaybackSink, PlaybackUnit, SchedulerCore};
pub use session::{
    CookingAccess, SessionLifecycle, SessionStatus, StudentProfile, VoiceSession,
    VoiceSessionConfig,
};
pub use transcript::{TranscriptAggregator, TranscriptSnapshot};
