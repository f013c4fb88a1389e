pub mod capture;
pub mod encode;
pub mod file;
pub mod frame;
pub mod microphone;

pub use capture::{CaptureBackend, CaptureBackendFactory, CaptureSource};
pub use file::FileBackend;
pub use frame::{AudioFrame, CaptureConfig, FrameAssembler};
pub use microphone::MicrophoneBackend;
