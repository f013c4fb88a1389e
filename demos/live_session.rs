// Live Session Example: talk to the CampusEats assistant from the terminal
//
// 1. Opens a live session against the Gemini Live endpoint
// 2. Streams the default microphone (or a WAV file) as 16kHz PCM frames
// 3. Plays the model's 24kHz audio replies through the default output
// 4. Prints both live transcripts while the conversation runs
//
// Prerequisites:
// - GEMINI_API_KEY exported in the environment
// - A working microphone (or set CAMPUS_VOICE_WAV=/path/to/input.wav)
//
// Usage: cargo run --example live_session

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use campus_voice::{
    CaptureBackendFactory, CaptureConfig, CaptureSource, CookingAccess, DeviceSink,
    GeminiLiveTransport, LiveClientConfig, StudentProfile, VoiceSession, VoiceSessionConfig,
};
use tokio::time::sleep;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        anyhow::bail!("GEMINI_API_KEY must be set");
    }

    let config = VoiceSessionConfig {
        api_key,
        profile: StudentProfile {
            budget_ksh: 250,
            location: "Nairobi CBD".to_string(),
            cooking_access: CookingAccess::Kettle,
        },
        ..Default::default()
    };

    let session = match std::env::var("CAMPUS_VOICE_WAV") {
        Ok(path) => {
            info!("using WAV capture source: {path}");
            let capture = CaptureBackendFactory::create(
                CaptureSource::File(path.into()),
                CaptureConfig {
                    sample_rate: config.input_sample_rate,
                    channels: 1,
                    frame_samples: config.frame_samples,
                },
            )?;
            let transport = Box::new(GeminiLiveTransport::new(LiveClientConfig {
                endpoint: config.endpoint.clone(),
                api_key: config.api_key.clone(),
            }));
            let sink = Arc::new(DeviceSink::new()?);
            let clock = sink.clock();
            VoiceSession::with_parts(config, capture, transport, sink, clock)
        }
        Err(_) => VoiceSession::new(config)?,
    };

    session.start().await?;
    info!("session started, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = sleep(Duration::from_secs(1)) => {
                let status = session.status().await;
                if let Some(error) = &status.error {
                    anyhow::bail!("session failed: {error}");
                }
                if !status.user_transcript.is_empty() {
                    println!("you: {}", status.user_transcript);
                }
                if !status.assistant_transcript.is_empty() {
                    println!("assistant: {}", status.assistant_transcript);
                }
            }
        }
    }

    let stats = session.stop().await;
    info!(
        "session stopped after {:.1}s ({} frames sent, {} chunks played)",
        stats.duration_secs, stats.frames_sent, stats.chunks_scheduled
    );

    Ok(())
}
