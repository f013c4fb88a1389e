//! Voice session management
//!
//! This module provides the `VoiceSession` orchestrator that manages:
//! - Microphone capture and frame encoding
//! - The live bidirectional connection, with streaming gated on readiness
//! - Gapless playback of model audio and barge-in interruption
//! - Live transcript accumulation and observable session state

mod config;
mod session;
mod stats;

pub use config::{
    CookingAccess, StudentProfile, VoiceSessionConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL,
};
pub use session::{SessionLifecycle, VoiceSession};
pub use stats::SessionStatus;
