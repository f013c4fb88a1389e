//! Live session transport
//!
//! This module owns the bidirectional streaming connection to the remote
//! voice model:
//! - serde wire types for the setup/media/serverContent protocol
//! - the `LiveTransport` seam the session manager talks through
//! - the WebSocket client implementation with readiness-gated sending

pub mod client;
pub mod messages;

pub use client::{
    send_gate, GatedFrames, GeminiLiveTransport, LiveClientConfig, LiveTransport, ReadyLatch,
    SendGate,
};
pub use messages::{
    MediaBlob, Modality, RealtimeMessage, ServerMessage, SessionSetup, SetupMessage,
    TranscriptionConfig,
};

/// Events delivered by a live session, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Server confirmed setup — ready to stream audio.
    Ready,
    /// Transcription fragment of the user's speech.
    InputTranscript { text: String },
    /// Transcription fragment of the model's speech.
    OutputTranscript { text: String },
    /// The model finished a response turn.
    TurnComplete,
    /// One chunk of model audio (base64 PCM at the output rate).
    Audio { data: String },
    /// The model was interrupted (user barge-in).
    Interrupted,
    /// Transport-level failure, distinct from a clean close.
    Error { message: String },
    /// The remote ended the session.
    Closed { reason: Option<String> },
}
