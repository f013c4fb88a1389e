// Output-side seams and the rodio device sink.
//
// The scheduler does all time arithmetic against `OutputClock` and hands
// fully-decoded units to a `PlaybackSink`; the sink owns the actual audio
// device. rodio output streams are not Send, so the device sink keeps the
// stream on a dedicated playback thread driven over a channel.

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rodio::buffer::SamplesBuffer;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::VoiceError;

/// Monotonic clock over the output timeline, in seconds.
pub trait OutputClock: Send + Sync {
    fn now(&self) -> f64;
}

/// One decoded audio chunk with its scheduled start time.
#[derive(Debug, Clone)]
pub struct PlaybackUnit {
    pub id: u64,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub start_at: f64,
}

impl PlaybackUnit {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Plays scheduled units on the output device.
pub trait PlaybackSink: Send + Sync {
    /// Arm `unit` to begin at `unit.start_at` on the clock timeline. `done`
    /// receives the unit id exactly once if the unit ends naturally; halted
    /// units never report completion.
    fn begin(&self, unit: PlaybackUnit, done: mpsc::UnboundedSender<u64>);

    /// Stop one unit immediately, whether armed or playing. Unknown ids are
    /// ignored.
    fn halt(&self, id: u64);
}

// ============================================================================
// Device sink (rodio)
// ============================================================================

/// Clock of the device sink: seconds since the sink was created.
pub struct DeviceClock {
    start: Instant,
}

impl OutputClock for DeviceClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

enum SinkCommand {
    Begin {
        unit: PlaybackUnit,
        done: mpsc::UnboundedSender<u64>,
    },
    Halt(u64),
}

/// Speaker output via rodio on a dedicated playback thread.
///
/// Hosts without an output device degrade to timing-only playback: units
/// still start and complete on schedule, they are just inaudible.
pub struct DeviceSink {
    cmd_tx: Mutex<std_mpsc::Sender<SinkCommand>>,
    clock: Arc<DeviceClock>,
}

impl DeviceSink {
    pub fn new() -> Result<Self, VoiceError> {
        let clock = Arc::new(DeviceClock {
            start: Instant::now(),
        });
        let (cmd_tx, cmd_rx) = std_mpsc::channel();

        let thread_clock = Arc::clone(&clock);
        let _ = std::thread::Builder::new()
            .name("campus-voice-playback".to_string())
            .spawn(move || run_playback_thread(cmd_rx, thread_clock))
            .map_err(|e| VoiceError::Playback(e.to_string()))?;

        Ok(Self {
            cmd_tx: Mutex::new(cmd_tx),
            clock,
        })
    }

    /// The clock the scheduler must use with this sink.
    pub fn clock(&self) -> Arc<dyn OutputClock> {
        Arc::clone(&self.clock) as Arc<dyn OutputClock>
    }
}

impl PlaybackSink for DeviceSink {
    fn begin(&self, unit: PlaybackUnit, done: mpsc::UnboundedSender<u64>) {
        if let Ok(cmd_tx) = self.cmd_tx.lock() {
            let _ = cmd_tx.send(SinkCommand::Begin { unit, done });
        }
    }

    fn halt(&self, id: u64) {
        if let Ok(cmd_tx) = self.cmd_tx.lock() {
            let _ = cmd_tx.send(SinkCommand::Halt(id));
        }
    }
}

struct ArmedUnit {
    unit: PlaybackUnit,
    done: mpsc::UnboundedSender<u64>,
}

struct PlayingUnit {
    id: u64,
    ends_at: f64,
    sink: Option<rodio::Sink>,
    done: mpsc::UnboundedSender<u64>,
}

fn run_playback_thread(cmd_rx: std_mpsc::Receiver<SinkCommand>, clock: Arc<DeviceClock>) {
    // The output stream must live on this thread for its whole lifetime.
    let output = rodio::OutputStream::try_default();
    let handle = match &output {
        Ok((_, handle)) => Some(handle.clone()),
        Err(e) => {
            warn!("audio output unavailable, playback will be silent: {e}");
            None
        }
    };

    let mut armed: Vec<ArmedUnit> = Vec::new();
    let mut playing: Vec<PlayingUnit> = Vec::new();

    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(5)) {
            Ok(SinkCommand::Begin { unit, done }) => armed.push(ArmedUnit { unit, done }),
            Ok(SinkCommand::Halt(id)) => {
                armed.retain(|a| a.unit.id != id);
                if let Some(pos) = playing.iter().position(|p| p.id == id) {
                    let stopped = playing.swap_remove(pos);
                    if let Some(sink) = stopped.sink {
                        sink.stop();
                    }
                }
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }

        let now = clock.now();

        // Start whatever has come due.
        let mut i = 0;
        while i < armed.len() {
            if armed[i].unit.start_at <= now {
                let ArmedUnit { unit, done } = armed.swap_remove(i);
                let sink = handle
                    .as_ref()
                    .and_then(|h| rodio::Sink::try_new(h).ok());
                if let Some(sink) = &sink {
                    sink.append(SamplesBuffer::new(1, unit.sample_rate, unit.samples.clone()));
                }
                playing.push(PlayingUnit {
                    id: unit.id,
                    ends_at: now + unit.duration_secs(),
                    sink,
                    done,
                });
            } else {
                i += 1;
            }
        }

        // Retire units that have played out.
        let mut j = 0;
        while j < playing.len() {
            if playing[j].ends_at <= now {
                let finished = playing.swap_remove(j);
                let _ = finished.done.send(finished.id);
            } else {
                j += 1;
            }
        }
    }

    for leftover in playing {
        if let Some(sink) = leftover.sink {
            sink.stop();
        }
    }
    debug!("playback thread exiting");
}
