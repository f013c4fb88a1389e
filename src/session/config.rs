use serde::{Deserialize, Serialize};

use crate::live::{Modality, SessionSetup, TranscriptionConfig};

/// Default live API endpoint (Gemini bidirectional streaming).
pub const DEFAULT_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default live model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// What the student can cook with, folded into the system instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookingAccess {
    None,
    Kettle,
    Full,
}

impl std::fmt::Display for CookingAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            CookingAccess::None => "no cooking facilities",
            CookingAccess::Kettle => "a kettle only",
            CookingAccess::Full => "a full kitchen",
        };
        f.write_str(text)
    }
}

/// Student context the assistant advises against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Meal budget in Kenyan shillings.
    pub budget_ksh: u32,
    /// Where the student is (campus, neighbourhood).
    pub location: String,
    pub cooking_access: CookingAccess,
}

impl Default for StudentProfile {
    fn default() -> Self {
        Self {
            budget_ksh: 300,
            location: "Nairobi".to_string(),
            cooking_access: CookingAccess::Kettle,
        }
    }
}

/// Configuration for one voice session
#[derive(Debug, Clone)]
pub struct VoiceSessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Live model identifier
    pub model: String,

    /// Prebuilt voice used for spoken replies
    pub voice: String,

    /// WebSocket endpoint of the live API
    pub endpoint: String,

    /// API key for the live API
    pub api_key: String,

    /// Capture sample rate (the live model expects 16kHz input)
    pub input_sample_rate: u32,

    /// Playback sample rate (the live model emits 24kHz audio)
    pub output_sample_rate: u32,

    /// Samples per capture window (bounds capture latency)
    pub frame_samples: usize,

    /// Student context injected as the system instruction
    pub profile: StudentProfile,
}

impl Default for VoiceSessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            model: DEFAULT_MODEL.to_string(),
            voice: "Kore".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_samples: 4096,
            profile: StudentProfile::default(),
        }
    }
}

impl VoiceSessionConfig {
    /// The system instruction built from the student's context.
    pub fn system_instruction(&self) -> String {
        format!(
            "You are CampusEats AI. Respond very concisely. Helping with KSh {} at {}. \
             The student has {}. Use search if needed for prices.",
            self.profile.budget_ksh, self.profile.location, self.profile.cooking_access
        )
    }

    /// The setup record sent when the live session opens.
    pub fn setup(&self) -> SessionSetup {
        SessionSetup {
            model: self.model.clone(),
            response_modalities: vec![Modality::Audio],
            input_audio_transcription: TranscriptionConfig::default(),
            output_audio_transcription: TranscriptionConfig::default(),
            voice: self.voice.clone(),
            system_instruction: self.system_instruction(),
        }
    }
}
