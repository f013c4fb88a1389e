//! Gapless playback scheduling
//!
//! Inbound audio chunks are decoded to PCM, appended strictly after the
//! previous chunk's end time on the output clock, and tracked so a barge-in
//! interruption can stop everything at once.

pub mod scheduler;
pub mod sink;

pub use scheduler::{PlaybackScheduler, SchedulerCore};
pub use sink::{DeviceSink, OutputClock, PlaybackSink, PlaybackUnit};
