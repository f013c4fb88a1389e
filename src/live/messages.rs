use serde::{Deserialize, Serialize};

use super::LiveEvent;

/// One encoded outbound audio frame: base64 PCM plus its MIME descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    pub data: String,
    pub mime_type: String,
}

/// Response modality requested at session open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Audio,
}

/// Presence of a transcription section enables that transcript stream.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TranscriptionConfig {}

/// Session configuration sent as the first message after connecting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetup {
    pub model: String,
    pub response_modalities: Vec<Modality>,
    pub input_audio_transcription: TranscriptionConfig,
    pub output_audio_transcription: TranscriptionConfig,
    pub voice: String,
    pub system_instruction: String,
}

/// Envelope for the setup message: `{"setup": {...}}`.
#[derive(Debug, Serialize)]
pub struct SetupMessage {
    pub setup: SessionSetup,
}

/// Envelope for one realtime audio frame: `{"media": {...}}`.
#[derive(Debug, Serialize)]
pub struct RealtimeMessage {
    pub media: MediaBlob,
}

// ============================================================================
// Inbound messages
// ============================================================================

/// Top-level inbound message from the live endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<SetupComplete>,
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetupComplete {}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    pub model_turn: Option<ModelTurn>,
    pub turn_complete: Option<bool>,
    pub interrupted: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub inline_data: Option<InlineData>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub data: String,
    #[serde(default)]
    pub mime_type: String,
}

impl ServerMessage {
    /// Flatten one server message into session events, in the order the
    /// session consumes them: transcripts, turn boundary, audio, barge-in.
    /// `setupComplete` is handled by the transport, not here.
    pub fn into_events(self) -> Vec<LiveEvent> {
        let mut events = Vec::new();

        let Some(content) = self.server_content else {
            return events;
        };

        if let Some(transcription) = content.output_transcription {
            if !transcription.text.is_empty() {
                events.push(LiveEvent::OutputTranscript {
                    text: transcription.text,
                });
            }
        }

        if let Some(transcription) = content.input_transcription {
            if !transcription.text.is_empty() {
                events.push(LiveEvent::InputTranscript {
                    text: transcription.text,
                });
            }
        }

        if content.turn_complete == Some(true) {
            events.push(LiveEvent::TurnComplete);
        }

        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(inline) = part.inline_data {
                    events.push(LiveEvent::Audio { data: inline.data });
                }
            }
        }

        if content.interrupted == Some(true) {
            events.push(LiveEvent::Interrupted);
        }

        events
    }
}
