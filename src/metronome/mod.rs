//! Click patterns and the lookahead scheduler that plays them.
//!
//! This module provides the metronome core: the pattern grid, the beat
//! scheduler, the countdown sequencer, and the [`Metronome`] controller that
//! ties them to a tone engine. Limits and defaults live here too, together
//! with the clamps applied to every value entering the core.

mod countdown;
mod observer;
mod pattern;
mod player;
mod preset;
mod scheduler;
mod timer;

pub use countdown::Countdown;
pub use observer::{PlaybackEvent, PlaybackObserver, PlaybackStatus, SessionMode};
pub use pattern::{ClickState, Cursor, Pattern};
pub use player::Metronome;
pub use preset::{builtin_presets, Preset, PresetError, PresetLibrary};
pub use scheduler::BeatScheduler;
pub use timer::CoarseTimer;

use std::time::Duration;

/// Maximum number of measures in a pattern.
pub const MAX_MEASURES: usize = 8;

/// Maximum number of beat slots per measure.
pub const MAX_BEATS: usize = 16;

/// Slowest supported tempo in beats per minute.
pub const MIN_BPM: u32 = 30;

/// Fastest supported tempo in beats per minute.
pub const MAX_BPM: u32 = 300;

/// Default tempo in beats per minute.
pub const DEFAULT_BPM: u32 = 60;

/// Default output volume.
pub const DEFAULT_VOLUME: f32 = 0.75;

/// Default number of active measures.
pub const DEFAULT_MEASURES: usize = 4;

/// Default number of beats in every measure.
pub const DEFAULT_BEATS: usize = 4;

/// Number of clicks in the lead-in countdown.
pub const COUNTDOWN_BEATS: u8 = 4;

/// Delay before the first countdown click, so it is never scheduled in the past.
pub const COUNTDOWN_LEAD_SECONDS: f64 = 0.1;

/// How far ahead of the engine clock beats are queued, in milliseconds.
pub const SCHEDULE_AHEAD_MS: u64 = 100;

/// How far ahead of the engine clock beats are queued, in seconds.
pub const SCHEDULE_AHEAD_SECONDS: f64 = SCHEDULE_AHEAD_MS as f64 / 1000.0;

/// Period of the scheduler's coarse poll timer in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 25;

// A poll period at or above the horizon leaves gaps in the queued audio.
const _: () = assert!(POLL_INTERVAL_MS < SCHEDULE_AHEAD_MS);

/// Period of the scheduler's coarse poll timer.
pub const POLL_INTERVAL: Duration = Duration::from_millis(POLL_INTERVAL_MS);

/// Converts a tempo to the length of one beat in seconds.
///
/// # Examples
///
/// ```
/// use clicktui::metronome::seconds_per_beat;
///
/// assert_eq!(seconds_per_beat(120), 0.5);
/// ```
pub fn seconds_per_beat(bpm: u32) -> f64 {
    60.0 / bpm as f64
}

/// Clamps a requested tempo into the supported range.
pub fn clamp_bpm(bpm: i64) -> u32 {
    bpm.clamp(MIN_BPM as i64, MAX_BPM as i64) as u32
}

/// Clamps a requested volume into [0, 1]. NaN becomes silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Clamps a requested measure count into `1..=MAX_MEASURES`.
pub fn clamp_measures(measures: usize) -> usize {
    measures.clamp(1, MAX_MEASURES)
}

/// Clamps a requested beat count into `1..=MAX_BEATS`.
pub fn clamp_beats(beats: usize) -> usize {
    beats.clamp(1, MAX_BEATS)
}
