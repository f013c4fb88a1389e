use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::sink::{OutputClock, PlaybackSink, PlaybackUnit};
use crate::audio::encode;
use crate::error::VoiceError;

/// Scheduling rules for inbound audio chunks.
///
/// Chunks arrive at irregular, possibly bursty intervals; each one is
/// appended at `max(next_available, now)` so playback is gapless and never
/// overlapping. Every armed-or-playing unit is tracked so an interruption
/// can stop all of them atomically and reset the reference time to zero.
pub struct SchedulerCore {
    clock: Arc<dyn OutputClock>,
    sink: Arc<dyn PlaybackSink>,
    done_tx: mpsc::UnboundedSender<u64>,
    sample_rate: u32,
    next_start: f64,
    next_id: u64,
    active: HashSet<u64>,
}

impl SchedulerCore {
    pub fn new(
        clock: Arc<dyn OutputClock>,
        sink: Arc<dyn PlaybackSink>,
        sample_rate: u32,
        done_tx: mpsc::UnboundedSender<u64>,
    ) -> Self {
        Self {
            clock,
            sink,
            done_tx,
            sample_rate,
            next_start: 0.0,
            next_id: 0,
            active: HashSet::new(),
        }
    }

    /// Decode one base64 PCM chunk and append it to the schedule. Returns the
    /// start time the unit was given. A malformed chunk is dropped without
    /// touching the schedule.
    pub fn enqueue(&mut self, encoded: &str) -> Result<f64, VoiceError> {
        let samples = encode::decode_playback_payload(encoded)?;

        let start_at = self.next_start.max(self.clock.now());
        let unit = PlaybackUnit {
            id: self.next_id,
            samples,
            sample_rate: self.sample_rate,
            start_at,
        };
        self.next_id += 1;
        self.next_start = start_at + unit.duration_secs();

        self.active.insert(unit.id);
        self.sink.begin(unit, self.done_tx.clone());

        Ok(start_at)
    }

    /// Halt every armed-or-playing unit and reset the reference time, so the
    /// next chunk starts at the current clock time instead of after stale
    /// scheduled audio.
    pub fn interrupt(&mut self) {
        let halted = self.active.len();
        for id in self.active.drain() {
            self.sink.halt(id);
        }
        self.next_start = 0.0;

        if halted > 0 {
            info!("interrupted playback, halted {halted} units");
        }
    }

    /// A unit finished naturally. Units already halted by an interruption
    /// are simply no longer tracked, so a late completion cannot stop
    /// anything twice.
    pub fn complete(&mut self, id: u64) {
        self.active.remove(&id);
    }

    /// Number of armed-or-playing units.
    pub fn active_units(&self) -> usize {
        self.active.len()
    }

    /// Where the next enqueued chunk would land, before clamping to "now".
    pub fn next_start(&self) -> f64 {
        self.next_start
    }
}

enum Command {
    Enqueue(String),
    Interrupt,
    Flush(oneshot::Sender<()>),
}

/// Task-confined playback scheduler.
///
/// All three mutation paths — enqueue from the inbound-event handler,
/// natural completions from the sink, and interrupts — are serialized
/// through one command loop, so a completion can never race an interrupt.
pub struct PlaybackScheduler {
    cmd_tx: mpsc::UnboundedSender<Command>,
    active_units: Arc<AtomicUsize>,
}

impl PlaybackScheduler {
    pub fn new(
        clock: Arc<dyn OutputClock>,
        sink: Arc<dyn PlaybackSink>,
        sample_rate: u32,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let active_units = Arc::new(AtomicUsize::new(0));

        let core = SchedulerCore::new(clock, sink, sample_rate, done_tx);
        tokio::spawn(run_scheduler(core, cmd_rx, done_rx, Arc::clone(&active_units)));

        Self {
            cmd_tx,
            active_units,
        }
    }

    /// Queue one base64 PCM chunk for gapless playback.
    pub fn enqueue(&self, encoded: impl Into<String>) {
        let _ = self.cmd_tx.send(Command::Enqueue(encoded.into()));
    }

    /// Stop all scheduled playback and reset the scheduling clock.
    pub fn interrupt(&self) {
        let _ = self.cmd_tx.send(Command::Interrupt);
    }

    /// Wait until every previously submitted command has been applied.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Number of armed-or-playing units, as of the last applied command.
    pub fn active_units(&self) -> usize {
        self.active_units.load(Ordering::Relaxed)
    }
}

async fn run_scheduler(
    mut core: SchedulerCore,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut done_rx: mpsc::UnboundedReceiver<u64>,
    active_units: Arc<AtomicUsize>,
) {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Enqueue(encoded)) => {
                    if let Err(e) = core.enqueue(&encoded) {
                        warn!("dropping audio chunk: {e}");
                    }
                }
                Some(Command::Interrupt) => core.interrupt(),
                Some(Command::Flush(reply)) => {
                    // Account for completions already reported before
                    // acknowledging, so observers see settled state.
                    while let Ok(id) = done_rx.try_recv() {
                        core.complete(id);
                    }
                    active_units.store(core.active_units(), Ordering::Relaxed);
                    let _ = reply.send(());
                }
                None => break,
            },
            Some(id) = done_rx.recv() => core.complete(id),
        }
        active_units.store(core.active_units(), Ordering::Relaxed);
    }

    // Scheduler going away stops whatever is still scheduled.
    core.interrupt();
    debug!("playback scheduler task exiting");
}
