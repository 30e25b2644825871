//! Lookahead beat scheduler.
//!
//! The event loop only wakes up every few milliseconds, which is far too
//! coarse to trigger clicks directly. Instead, each poll tops up the tone
//! engine's queue with clicks carrying exact timestamps on the engine clock,
//! always staying [`SCHEDULE_AHEAD_SECONDS`] ahead of it. The engine does
//! the precise timing; the poll only has to come around before the queue
//! runs dry.

use super::observer::{PlaybackEvent, PlaybackObserver};
use super::pattern::{Cursor, Pattern};
use super::timer::CoarseTimer;
use super::{seconds_per_beat, POLL_INTERVAL, SCHEDULE_AHEAD_SECONDS};
use crate::audio::ToneEngine;
use std::time::Instant;

/// Everything that lives for one playback session.
#[derive(Debug, Clone)]
struct Session {
    /// Pattern snapshot taken at start. Edits stop playback, so it never
    /// has to be refreshed.
    pattern: Pattern,
    seconds_per_beat: f64,
    /// Engine time of the first beat.
    origin: f64,
    /// Beats queued so far; the next one sounds at
    /// `origin + beats_queued * seconds_per_beat`.
    beats_queued: u64,
    /// Position of the next beat to queue.
    cursor: Cursor,
}

impl Session {
    fn next_event_time(&self) -> f64 {
        self.origin + self.beats_queued as f64 * self.seconds_per_beat
    }
}

/// Walks a pattern in engine time and queues its clicks ahead of playout.
///
/// Idle until [`start`](Self::start), Running until [`stop`](Self::stop).
#[derive(Debug, Default)]
pub struct BeatScheduler {
    session: Option<Session>,
    timer: CoarseTimer,
}

impl BeatScheduler {
    /// Creates an idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a session is running.
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Position of the next beat to be queued.
    pub fn cursor(&self) -> Option<Cursor> {
        self.session.as_ref().map(|s| s.cursor)
    }

    /// Engine time at which the next unqueued beat must sound.
    pub fn next_event_time(&self) -> Option<f64> {
        self.session.as_ref().map(Session::next_event_time)
    }

    /// When the next poll is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Starts a session whose first beat sounds at `at_time` on the engine clock.
    ///
    /// Resets the cursor to the origin, runs the first poll right away and
    /// arms the poll timer.
    ///
    /// # Arguments
    ///
    /// * `at_time` - Engine time of the first beat
    /// * `now` - Host time, used only for the coarse poll timer
    /// * `pattern` - Pattern to play; copied for the session
    /// * `bpm` - Tempo, already clamped
    ///
    /// # Returns
    ///
    /// The number of beats queued by the first poll.
    pub fn start(
        &mut self,
        at_time: f64,
        now: Instant,
        pattern: &Pattern,
        bpm: u32,
        engine: &dyn ToneEngine,
        observer: &mut dyn PlaybackObserver,
    ) -> usize {
        self.session = Some(Session {
            pattern: pattern.clone(),
            seconds_per_beat: seconds_per_beat(bpm),
            origin: at_time,
            beats_queued: 0,
            cursor: Cursor::ORIGIN,
        });
        tracing::debug!("Scheduler started at engine time {:.3}s, {} bpm", at_time, bpm);

        let queued = self.fill(engine, observer);
        self.timer.arm_once(now, POLL_INTERVAL);
        queued
    }

    /// Runs a poll if the poll timer has fired, then re-arms it.
    ///
    /// # Returns
    ///
    /// The number of beats queued by this poll.
    pub fn poll(
        &mut self,
        now: Instant,
        engine: &dyn ToneEngine,
        observer: &mut dyn PlaybackObserver,
    ) -> usize {
        if !self.timer.fire(now) {
            return 0;
        }
        let queued = self.fill(engine, observer);
        self.timer.arm_once(now, POLL_INTERVAL);
        queued
    }

    /// Cancels the pending poll and ends the session.
    ///
    /// # Returns
    ///
    /// true if a session was running.
    pub fn stop(&mut self) -> bool {
        self.timer.cancel();
        let was_running = self.session.take().is_some();
        if was_running {
            tracing::debug!("Scheduler stopped");
        }
        was_running
    }

    /// Queues every beat that falls inside the lookahead horizon.
    fn fill(&mut self, engine: &dyn ToneEngine, observer: &mut dyn PlaybackObserver) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };

        let horizon = engine.current_time() + SCHEDULE_AHEAD_SECONDS;
        let mut queued = 0;
        while session.next_event_time() < horizon {
            let cursor = session.cursor;
            observer.notify(PlaybackEvent::Position(cursor));

            let state = session.pattern.cell(cursor.measure, cursor.beat);
            if let Some(timbre) = state.timbre() {
                engine.schedule_click(timbre, session.next_event_time());
            }

            session.beats_queued += 1;
            session.cursor = session.pattern.advance(cursor);
            queued += 1;
        }
        queued
    }
}
