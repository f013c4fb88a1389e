use chrono::{DateTime, Utc};
use serde::Serialize;

/// Observable state of a voice session, as served to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Session identifier ("" when no session exists)
    pub session_id: String,

    /// Whether the session is streaming audio both ways
    pub is_active: bool,

    /// Whether the session is still waiting for the live endpoint
    pub is_connecting: bool,

    /// Human-readable failure, if the session ended in error
    pub error: Option<String>,

    /// When the session was started
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds since start
    pub duration_secs: f64,

    /// Outbound audio frames delivered to the transport
    pub frames_sent: usize,

    /// Inbound audio chunks handed to the playback scheduler
    pub chunks_scheduled: usize,

    /// Playback units currently armed or playing
    pub active_playback_units: usize,

    /// Live transcript of the user's speech this turn
    pub user_transcript: String,

    /// Live transcript of the assistant's speech this turn
    pub assistant_transcript: String,
}

impl SessionStatus {
    /// Status reported when no session exists.
    pub fn idle() -> Self {
        Self {
            session_id: String::new(),
            is_active: false,
            is_connecting: false,
            error: None,
            started_at: None,
            duration_secs: 0.0,
            frames_sent: 0,
            chunks_scheduled: 0,
            active_playback_units: 0,
            user_transcript: String::new(),
            assistant_transcript: String::new(),
        }
    }
}
