// Scheduling properties of the playback scheduler: gapless sequential start
// times, interruption semantics, and completion bookkeeping.

mod common;

use std::sync::Arc;

use campus_voice::{OutputClock, PlaybackScheduler, PlaybackSink, SchedulerCore, VoiceError};
use common::{pcm_chunk, ManualClock, RecordingSink};
use tokio::sync::mpsc;

const OUTPUT_RATE: u32 = 24000;

fn core_with(
    clock: &Arc<ManualClock>,
    sink: &Arc<RecordingSink>,
) -> (SchedulerCore, mpsc::UnboundedReceiver<u64>) {
    let (done_tx, done_rx) = mpsc::unbounded_channel();
    (
        SchedulerCore::new(
            Arc::clone(clock) as Arc<dyn OutputClock>,
            Arc::clone(sink) as Arc<dyn PlaybackSink>,
            OUTPUT_RATE,
            done_tx,
        ),
        done_rx,
    )
}

fn seconds(secs: f64) -> String {
    pcm_chunk((secs * OUTPUT_RATE as f64) as usize)
}

#[test]
fn chunks_are_scheduled_gapless_and_in_order() {
    let clock = ManualClock::new();
    let sink = RecordingSink::new();
    let (mut core, _done) = core_with(&clock, &sink);

    let starts = [
        core.enqueue(&seconds(1.0)).unwrap(),
        core.enqueue(&seconds(0.5)).unwrap(),
        core.enqueue(&seconds(2.0)).unwrap(),
    ];

    assert_eq!(starts, [0.0, 1.0, 1.5]);
    assert_eq!(core.next_start(), 3.5);
    assert_eq!(core.active_units(), 3);

    let begun = sink.begun();
    assert_eq!(begun.len(), 3);
    for window in begun.windows(2) {
        assert_eq!(window[1].start_at, window[0].start_at + window[0].duration);
    }
}

#[test]
fn chunk_never_starts_before_its_predecessor_ends() {
    let clock = ManualClock::new();
    let sink = RecordingSink::new();
    let (mut core, _done) = core_with(&clock, &sink);

    let first = core.enqueue(&seconds(1.0)).unwrap();
    assert_eq!(first, 0.0);

    // The first chunk is mid-playback: the next one queues behind it
    // instead of starting immediately.
    clock.set(0.2);
    let second = core.enqueue(&seconds(0.5)).unwrap();
    assert_eq!(second, 1.0);
}

#[test]
fn idle_schedule_catches_up_to_the_clock() {
    let clock = ManualClock::new();
    let sink = RecordingSink::new();
    let (mut core, _done) = core_with(&clock, &sink);

    core.enqueue(&seconds(1.0)).unwrap();

    // Long silence after the first chunk played out.
    clock.set(5.0);
    let start = core.enqueue(&seconds(0.5)).unwrap();
    assert_eq!(start, 5.0);
    assert_eq!(core.next_start(), 5.5);
}

#[test]
fn interrupt_halts_everything_and_resets_the_schedule() {
    let clock = ManualClock::new();
    let sink = RecordingSink::new();
    let (mut core, _done) = core_with(&clock, &sink);

    core.enqueue(&seconds(1.0)).unwrap();
    core.enqueue(&seconds(0.5)).unwrap();
    core.enqueue(&seconds(2.0)).unwrap();

    clock.set(1.2);
    core.interrupt();

    let mut halted = sink.halted();
    halted.sort_unstable();
    assert_eq!(halted, vec![0, 1, 2]);
    assert_eq!(core.active_units(), 0);

    // The next chunk starts now, not at the stale 3.5s offset.
    let start = core.enqueue(&seconds(0.3)).unwrap();
    assert_eq!(start, 1.2);
    assert_eq!(core.next_start(), 1.5);
}

#[test]
fn late_completion_of_a_halted_unit_is_ignored() {
    let clock = ManualClock::new();
    let sink = RecordingSink::new();
    let (mut core, _done) = core_with(&clock, &sink);

    core.enqueue(&seconds(1.0)).unwrap();
    core.enqueue(&seconds(1.0)).unwrap();
    core.interrupt();

    // The unit would have ended naturally around now; its completion must
    // not halt anything a second time.
    core.complete(0);
    assert_eq!(core.active_units(), 0);
    assert_eq!(sink.halted().len(), 2);
}

#[test]
fn natural_completion_removes_the_unit_without_halting() {
    let clock = ManualClock::new();
    let sink = RecordingSink::new();
    let (mut core, _done) = core_with(&clock, &sink);

    core.enqueue(&seconds(1.0)).unwrap();
    assert_eq!(core.active_units(), 1);

    core.complete(0);
    assert_eq!(core.active_units(), 0);
    assert!(sink.halted().is_empty());
}

#[test]
fn malformed_chunk_is_dropped_without_touching_the_schedule() {
    let clock = ManualClock::new();
    let sink = RecordingSink::new();
    let (mut core, _done) = core_with(&clock, &sink);

    core.enqueue(&seconds(1.0)).unwrap();

    let err = core.enqueue("&&& not base64 &&&").unwrap_err();
    assert!(matches!(err, VoiceError::Decode(_)));
    assert_eq!(core.active_units(), 1);
    assert_eq!(sink.begun().len(), 1);

    // The session keeps playing: the next valid chunk lands where the
    // schedule left off.
    let start = core.enqueue(&seconds(0.5)).unwrap();
    assert_eq!(start, 1.0);
}

#[test]
fn empty_chunk_does_not_advance_the_schedule() {
    let clock = ManualClock::new();
    let sink = RecordingSink::new();
    let (mut core, _done) = core_with(&clock, &sink);

    let start = core.enqueue(&pcm_chunk(0)).unwrap();
    assert_eq!(start, 0.0);
    assert_eq!(core.next_start(), 0.0);
}

#[tokio::test]
async fn scheduler_task_serializes_enqueue_completion_and_interrupt() {
    let clock = ManualClock::new();
    let sink = RecordingSink::new();
    let scheduler = PlaybackScheduler::new(
        Arc::clone(&clock) as Arc<dyn OutputClock>,
        Arc::clone(&sink) as Arc<dyn PlaybackSink>,
        OUTPUT_RATE,
    );

    scheduler.enqueue(seconds(1.0));
    scheduler.enqueue(seconds(0.5));
    scheduler.flush().await;
    assert_eq!(scheduler.active_units(), 2);

    let first = sink.begun()[0].id;
    sink.complete(first);
    scheduler.flush().await;
    assert_eq!(scheduler.active_units(), 1);
    assert!(sink.halted().is_empty());

    scheduler.interrupt();
    scheduler.flush().await;
    assert_eq!(scheduler.active_units(), 0);
    assert_eq!(sink.halted().len(), 1);

    // A chunk enqueued after the interrupt starts fresh.
    clock.set(2.0);
    scheduler.enqueue(seconds(0.5));
    scheduler.flush().await;
    let begun = sink.begun();
    assert_eq!(begun.last().unwrap().start_at, 2.0);
}
