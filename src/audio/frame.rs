/// Audio sample data (16-bit PCM, mono)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Frame duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Configuration for capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (will decimate if the device runs faster)
    pub sample_rate: u32,
    /// Target channel count (the live endpoint expects mono)
    pub channels: u16,
    /// Samples per capture window (bounds latency)
    pub frame_samples: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz input rate for the live model
            channels: 1,        // Mono
            frame_samples: 4096,
        }
    }
}

/// Reassembles a device sample stream into fixed-size mono frames.
///
/// Device callbacks deliver interleaved samples in arbitrary-sized bursts at
/// the device rate. The assembler takes channel 0, decimates by an integer
/// ratio down to the target rate, and emits complete frames of exactly
/// `frame_samples` samples. Decimation phase is carried across calls so the
/// stride stays aligned over burst boundaries.
#[derive(Debug)]
pub struct FrameAssembler {
    stride: usize,
    cursor: usize,
    frame_samples: usize,
    pending: Vec<i16>,
}

impl FrameAssembler {
    /// `device_rate`/`device_channels` describe the incoming interleaved
    /// stream; `target_rate` is what the frames come out at.
    pub fn new(
        device_rate: u32,
        device_channels: u16,
        target_rate: u32,
        frame_samples: usize,
    ) -> Self {
        // Decimate: take every Nth sample of channel 0. Devices slower than
        // the target are passed through rather than upsampled.
        let ratio = (device_rate / target_rate.max(1)).max(1) as usize;
        Self {
            stride: ratio * device_channels.max(1) as usize,
            cursor: 0,
            frame_samples,
            pending: Vec::with_capacity(frame_samples),
        }
    }

    /// Feed one interleaved burst, returning any completed frames.
    pub fn push(&mut self, data: &[i16]) -> Vec<Vec<i16>> {
        let mut frames = Vec::new();
        for (i, &sample) in data.iter().enumerate() {
            if (self.cursor + i) % self.stride == 0 {
                self.pending.push(sample);
                if self.pending.len() == self.frame_samples {
                    frames.push(std::mem::replace(
                        &mut self.pending,
                        Vec::with_capacity(self.frame_samples),
                    ));
                }
            }
        }
        self.cursor = (self.cursor + data.len()) % self.stride;
        frames
    }

    /// Samples buffered toward the next frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
