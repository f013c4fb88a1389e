use base64::Engine;

use super::frame::AudioFrame;
use crate::error::VoiceError;
use crate::live::MediaBlob;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Convert floating-point samples (range [-1, 1]) to 16-bit PCM.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect()
}

/// Convert 16-bit PCM back to floating-point samples for playback.
pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// MIME descriptor the live endpoint expects for raw PCM at `rate` Hz.
pub fn pcm_mime(rate: u32) -> String {
    format!("audio/pcm;rate={rate}")
}

/// Encode one captured frame into the wire blob: little-endian 16-bit PCM,
/// base64, tagged with its MIME descriptor.
pub fn frame_to_media(frame: &AudioFrame) -> MediaBlob {
    let mut bytes = Vec::with_capacity(frame.samples.len() * 2);
    for sample in &frame.samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }

    MediaBlob {
        data: BASE64.encode(&bytes),
        mime_type: pcm_mime(frame.sample_rate),
    }
}

/// Decode one inbound base64 PCM payload into playback samples.
///
/// A malformed payload is a per-chunk failure: callers drop the chunk and
/// keep the session alive.
pub fn decode_playback_payload(encoded: &str) -> Result<Vec<f32>, VoiceError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| VoiceError::Decode(format!("invalid base64: {e}")))?;

    if bytes.len() % 2 != 0 {
        return Err(VoiceError::Decode(format!(
            "odd PCM payload length: {} bytes",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect())
}
