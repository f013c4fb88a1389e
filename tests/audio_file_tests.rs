// File capture backend: WAV replay as fixed-size frames, format checks,
// and idempotent stop.

use std::path::Path;

use campus_voice::{
    CaptureBackendFactory, CaptureConfig, CaptureSource, FileBackend, VoiceError,
};

fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

#[tokio::test]
async fn wav_file_replays_as_fixed_size_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.wav");
    let samples: Vec<i16> = (0..1200).map(|i| (i % 100) as i16).collect();
    write_wav(&path, 16000, 1, &samples);

    let mut backend = FileBackend::new(
        path,
        CaptureConfig {
            sample_rate: 16000,
            channels: 1,
            frame_samples: 512,
        },
    );

    use campus_voice::CaptureBackend;
    let mut rx = backend.start().await.unwrap();
    assert!(backend.is_capturing());

    let mut received = Vec::new();
    let mut frames = 0usize;
    while let Some(frame) = rx.recv().await {
        assert_eq!(frame.sample_rate, 16000);
        assert_eq!(frame.channels, 1);
        received.extend(frame.samples);
        frames += 1;
    }

    assert_eq!(frames, 3, "1200 samples in 512-sample windows");
    assert_eq!(received, samples);

    backend.stop().await.unwrap();
    assert!(!backend.is_capturing());
}

#[tokio::test]
async fn stereo_input_is_mixed_down_and_decimated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");

    // Left carries a ramp, right is silent: the mono mix is the ramp, and
    // 48kHz decimates 3:1 down to 16kHz.
    let mut interleaved = Vec::new();
    for i in 0..960i16 {
        interleaved.push(i);
        interleaved.push(0);
    }
    write_wav(&path, 48000, 2, &interleaved);

    let mut backend = FileBackend::new(
        path,
        CaptureConfig {
            sample_rate: 16000,
            channels: 1,
            frame_samples: 160,
        },
    );

    use campus_voice::CaptureBackend;
    let mut rx = backend.start().await.unwrap();

    let mut received = Vec::new();
    while let Some(frame) = rx.recv().await {
        received.extend(frame.samples);
    }

    let expected: Vec<i16> = (0..960).step_by(3).collect();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn missing_file_fails_to_start() {
    let mut backend = FileBackend::new(
        "does-not-exist.wav".into(),
        CaptureConfig::default(),
    );

    use campus_voice::CaptureBackend;
    let err = backend.start().await.unwrap_err();
    assert!(matches!(err, VoiceError::Capture(_)));
    assert!(!backend.is_capturing());
}

#[tokio::test]
async fn non_pcm16_wav_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("float.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..100 {
        writer.write_sample(0.5f32).unwrap();
    }
    writer.finalize().unwrap();

    let mut backend = FileBackend::new(path, CaptureConfig::default());

    use campus_voice::CaptureBackend;
    let err = backend.start().await.unwrap_err();
    assert!(matches!(err, VoiceError::Capture(_)));
}

#[tokio::test]
async fn stop_ends_delivery_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.wav");
    write_wav(&path, 16000, 1, &vec![42i16; 16000 * 5]);

    let mut backend = FileBackend::new(
        path,
        CaptureConfig {
            sample_rate: 16000,
            channels: 1,
            frame_samples: 4096,
        },
    );

    use campus_voice::CaptureBackend;
    let mut rx = backend.start().await.unwrap();
    let first = rx.recv().await;
    assert!(first.is_some());

    backend.stop().await.unwrap();
    backend.stop().await.unwrap();
    assert!(!backend.is_capturing());

    // The channel drains whatever was in flight, then closes for good.
    while rx.recv().await.is_some() {}
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn factory_builds_the_requested_backend() {
    use campus_voice::CaptureBackend;
    let config = CaptureConfig::default();

    let file = CaptureBackendFactory::create(
        CaptureSource::File("input.wav".into()),
        config.clone(),
    )
    .unwrap();
    assert_eq!(file.name(), "file");

    let microphone =
        CaptureBackendFactory::create(CaptureSource::Microphone, config).unwrap();
    assert_eq!(microphone.name(), "microphone");
}
