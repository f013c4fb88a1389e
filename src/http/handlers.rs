use super::state::AppState;
use crate::session::{
    CookingAccess, SessionStatus, StudentProfile, VoiceSession, VoiceSessionConfig,
};
use crate::transcript::TranscriptSnapshot;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartVoiceRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Meal budget in Kenyan shillings
    pub budget_ksh: u32,

    /// Where the student is
    pub location: String,

    /// What the student can cook with
    pub cooking_access: CookingAccess,
}

#[derive(Debug, Serialize)]
pub struct StartVoiceResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopVoiceResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
    pub stats: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /voice/start
/// Open the voice session
pub async fn start_voice(
    State(state): State<AppState>,
    Json(req): Json<StartVoiceRequest>,
) -> impl IntoResponse {
    // Only one session at a time
    {
        let session = state.session.read().await;
        if session.is_some() {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "a voice session is already open".to_string(),
                }),
            )
                .into_response();
        }
    }

    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("voice-{}", uuid::Uuid::new_v4()));

    info!("starting voice session: {}", session_id);

    let config = VoiceSessionConfig {
        session_id: session_id.clone(),
        model: state.config.live.model.clone(),
        voice: state.config.live.voice.clone(),
        endpoint: state.config.live.endpoint.clone(),
        api_key: state.api_key.clone(),
        input_sample_rate: state.config.audio.input_sample_rate,
        output_sample_rate: state.config.audio.output_sample_rate,
        frame_samples: state.config.audio.frame_samples,
        profile: StudentProfile {
            budget_ksh: req.budget_ksh,
            location: req.location,
            cooking_access: req.cooking_access,
        },
    };

    let session = match VoiceSession::new(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("failed to create voice session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("failed to create voice session: {}", e),
                }),
            )
                .into_response();
        }
    };

    if let Err(e) = session.start().await {
        error!("failed to start voice session: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("failed to start voice session: {}", e),
            }),
        )
            .into_response();
    }

    {
        let mut slot = state.session.write().await;
        *slot = Some(session);
    }

    info!("voice session started: {}", session_id);

    (
        StatusCode::OK,
        Json(StartVoiceResponse {
            session_id: session_id.clone(),
            status: "connecting".to_string(),
            message: format!("Voice session {} opened", session_id),
        }),
    )
        .into_response()
}

/// POST /voice/stop
/// Stop the voice session
pub async fn stop_voice(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let mut slot = state.session.write().await;
        slot.take()
    };

    match session {
        Some(session) => {
            let stats = session.stop().await;
            info!("voice session stopped: {}", session.session_id());
            (
                StatusCode::OK,
                Json(StopVoiceResponse {
                    session_id: session.session_id().to_string(),
                    status: "stopped".to_string(),
                    message: "Voice session stopped".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no voice session is open".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /voice/status
/// Observable session state for the UI. Reports an idle status when no
/// session exists, so the flags are always readable.
pub async fn voice_status(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;

    let status = match session.as_ref() {
        Some(session) => session.status().await,
        None => SessionStatus::idle(),
    };

    (StatusCode::OK, Json(status)).into_response()
}

/// GET /voice/transcript
/// Live transcript buffers for the current turn
pub async fn voice_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;

    let snapshot = match session.as_ref() {
        Some(session) => session.transcript().await,
        None => TranscriptSnapshot::default(),
    };

    (StatusCode::OK, Json(snapshot)).into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
