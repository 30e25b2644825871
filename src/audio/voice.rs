//! Click synthesis.
//!
//! A click is a short sine burst with a 1 ms linear attack followed by an
//! exponential decay. Voices are queued with an absolute start frame and
//! rendered by [`ClickRenderer`], which also owns the sample clock and the
//! master gain shared by every click.

use std::f32::consts::TAU;

/// Sample rate for click synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Attack time in seconds (linear ramp from silence to peak).
pub const ATTACK_SECONDS: f32 = 0.001;

/// Time in seconds at which the exponential decay reaches [`DECAY_FLOOR`].
pub const DECAY_SECONDS: f32 = 0.05;

/// Total lifetime of a voice in seconds, after which it is released.
pub const CLICK_SECONDS: f32 = 0.055;

/// Amplitude the decay ramps down to.
const DECAY_FLOOR: f32 = 0.001;

/// Hard cap on simultaneously sounding voices. At 300 bpm plus a countdown
/// no more than two clicks ever overlap, so this is generous.
const MAX_ACTIVE_VOICES: usize = 16;

/// The two click sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timbre {
    /// Lower, quieter click for ordinary beats.
    Normal,
    /// Higher, louder click for accented beats and the countdown.
    Accent,
}

impl Timbre {
    /// Oscillator frequency in Hz.
    pub fn frequency(self) -> f32 {
        match self {
            Timbre::Normal => 880.0,
            Timbre::Accent => 1200.0,
        }
    }

    /// Envelope peak amplitude.
    pub fn peak_gain(self) -> f32 {
        match self {
            Timbre::Normal => 0.7,
            Timbre::Accent => 1.0,
        }
    }
}

/// Envelope amplitude `t` seconds after the click starts.
///
/// Follows the same curve shape as a Web Audio linear ramp followed by an
/// exponential ramp: `peak * (floor / peak) ^ progress` during the decay.
pub fn envelope(timbre: Timbre, t: f32) -> f32 {
    let peak = timbre.peak_gain();
    if t < 0.0 || t >= CLICK_SECONDS {
        0.0
    } else if t < ATTACK_SECONDS {
        peak * t / ATTACK_SECONDS
    } else if t < DECAY_SECONDS {
        let progress = (t - ATTACK_SECONDS) / (DECAY_SECONDS - ATTACK_SECONDS);
        peak * (DECAY_FLOOR / peak).powf(progress)
    } else {
        DECAY_FLOOR
    }
}

/// Converts a time on the engine clock to the nearest frame index.
pub fn seconds_to_frame(seconds: f64) -> u64 {
    (seconds.max(0.0) * SAMPLE_RATE as f64).round() as u64
}

/// Converts a frame index to seconds on the engine clock.
pub fn frame_to_seconds(frame: u64) -> f64 {
    frame as f64 / SAMPLE_RATE as f64
}

/// A click waiting for, or in the middle of, playback.
#[derive(Debug, Clone, Copy)]
struct Voice {
    timbre: Timbre,
    /// Absolute frame at which the click starts.
    start_frame: u64,
    /// Oscillator phase in radians.
    phase: f32,
    /// Radians per sample.
    phase_inc: f32,
}

impl Voice {
    fn new(timbre: Timbre, start_frame: u64) -> Self {
        Self {
            timbre,
            start_frame,
            phase: 0.0,
            phase_inc: TAU * timbre.frequency() / SAMPLE_RATE as f32,
        }
    }

    /// Renders one sample at `frame`. Returns None once the voice is finished.
    fn next_sample(&mut self, frame: u64) -> Option<f32> {
        let elapsed = frame_to_seconds(frame.saturating_sub(self.start_frame)) as f32;
        if elapsed >= CLICK_SECONDS {
            return None;
        }
        let sample = envelope(self.timbre, elapsed) * self.phase.sin();
        self.phase += self.phase_inc;
        if self.phase > TAU {
            self.phase -= TAU;
        }
        Some(sample)
    }
}

/// Renders queued clicks into mono samples and keeps the sample clock.
///
/// The frame counter only moves forward as samples are rendered, which makes
/// it the authoritative engine clock.
#[derive(Debug)]
pub struct ClickRenderer {
    /// Clicks not yet started, kept sorted by start frame.
    pending: Vec<Voice>,
    /// Clicks currently sounding.
    active: Vec<Voice>,
    /// Number of frames rendered so far.
    frame: u64,
    /// Master output gain in [0, 1].
    gain: f32,
}

impl Default for ClickRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClickRenderer {
    /// Creates a silent renderer at frame 0 with unity gain.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            active: Vec::with_capacity(MAX_ACTIVE_VOICES),
            frame: 0,
            gain: 1.0,
        }
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Current master gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Sets the master gain, clamped to [0, 1]. Takes effect on the next sample.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
    }

    /// Number of clicks queued but not yet started.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Queues a click to start at `start_frame`.
    ///
    /// A start frame in the past starts on the next rendered frame.
    pub fn schedule(&mut self, timbre: Timbre, start_frame: u64) {
        let start_frame = start_frame.max(self.frame);
        let voice = Voice::new(timbre, start_frame);
        let idx = self
            .pending
            .partition_point(|v| v.start_frame <= start_frame);
        self.pending.insert(idx, voice);
    }

    /// Renders the next sample and advances the clock by one frame.
    pub fn next_sample(&mut self) -> f32 {
        let frame = self.frame;

        // Promote every pending voice whose start frame has arrived
        let due = self.pending.partition_point(|v| v.start_frame <= frame);
        for voice in self.pending.drain(..due) {
            if self.active.len() == MAX_ACTIVE_VOICES {
                self.active.remove(0);
            }
            self.active.push(voice);
        }

        let mut out = 0.0f32;
        self.active.retain_mut(|voice| match voice.next_sample(frame) {
            Some(sample) => {
                out += sample;
                true
            }
            None => false,
        });

        self.frame += 1;
        (out * self.gain).clamp(-1.0, 1.0)
    }

    /// Fills `buf` with consecutive samples.
    pub fn render(&mut self, buf: &mut [f32]) {
        for sample in buf.iter_mut() {
            *sample = self.next_sample();
        }
    }
}
