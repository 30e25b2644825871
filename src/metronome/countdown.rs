//! Lead-in countdown.
//!
//! All four countdown clicks are queued on the engine up front, since their
//! times are known the moment the countdown begins. The coarse timer only
//! drives the visible 4-3-2-1 counter. The first downbeat is computed from
//! the engine clock at the start, so however late the counter runs, playback
//! still begins exactly one beat after the last countdown click.

use super::observer::{PlaybackEvent, PlaybackObserver};
use super::timer::CoarseTimer;
use super::{seconds_per_beat, COUNTDOWN_BEATS, COUNTDOWN_LEAD_SECONDS};
use crate::audio::{Timbre, ToneEngine};
use std::time::{Duration, Instant};

/// A running countdown.
#[derive(Debug)]
pub struct Countdown {
    remaining: u8,
    lead_time: f64,
    downbeat_time: f64,
    timer: CoarseTimer,
}

impl Countdown {
    /// Queues the countdown clicks, publishes the first counter value and
    /// arms the counter timer.
    ///
    /// # Arguments
    ///
    /// * `engine` - Initialized tone engine
    /// * `bpm` - Tempo, already clamped
    /// * `now` - Host time, used only for the counter timer
    pub fn begin(
        engine: &dyn ToneEngine,
        bpm: u32,
        now: Instant,
        observer: &mut dyn PlaybackObserver,
    ) -> Self {
        let beat = seconds_per_beat(bpm);
        let lead_time = engine.current_time() + COUNTDOWN_LEAD_SECONDS;
        let downbeat_time = lead_time + COUNTDOWN_BEATS as f64 * beat;

        for i in 0..COUNTDOWN_BEATS {
            engine.schedule_click(Timbre::Accent, lead_time + i as f64 * beat);
        }

        let mut timer = CoarseTimer::new();
        timer.arm_repeating(now, Duration::from_secs_f64(beat));
        observer.notify(PlaybackEvent::Countdown(COUNTDOWN_BEATS));
        tracing::debug!(
            "Countdown started: first click at {:.3}s, downbeat at {:.3}s",
            lead_time,
            downbeat_time
        );

        Self {
            remaining: COUNTDOWN_BEATS,
            lead_time,
            downbeat_time,
            timer,
        }
    }

    /// Counter value currently shown (0 once finished).
    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    /// Engine time of the first countdown click.
    pub fn lead_time(&self) -> f64 {
        self.lead_time
    }

    /// Engine time at which playback must start.
    pub fn downbeat_time(&self) -> f64 {
        self.downbeat_time
    }

    /// Returns true until the counter has reached 0 or the countdown was
    /// cancelled.
    pub fn is_running(&self) -> bool {
        self.timer.is_armed()
    }

    /// When the counter timer fires next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Steps the counter if its timer has fired.
    ///
    /// # Returns
    ///
    /// The downbeat time once the counter reaches 0, exactly once.
    pub fn tick(&mut self, now: Instant, observer: &mut dyn PlaybackObserver) -> Option<f64> {
        if !self.timer.fire(now) {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        observer.notify(PlaybackEvent::Countdown(self.remaining));
        if self.remaining > 0 {
            return None;
        }

        self.timer.cancel();
        Some(self.downbeat_time)
    }

    /// Stops the counter. Clicks already queued on the engine still sound.
    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.remaining = 0;
    }
}
