//! The metronome controller.
//!
//! [`Metronome`] owns the tone engine and the current settings, runs the
//! countdown and the beat scheduler, and keeps the outbound status snapshot
//! up to date. It is the configuration boundary of the core: every value is
//! clamped here, and any edit to the tempo or the pattern while a countdown
//! or playback is running stops it rather than trying to splice the change
//! into the running session.

use super::countdown::Countdown;
use super::observer::{PlaybackEvent, PlaybackObserver, PlaybackStatus, SessionMode};
use super::pattern::{ClickState, Pattern};
use super::scheduler::BeatScheduler;
use super::{clamp_bpm, clamp_volume, DEFAULT_BPM, DEFAULT_VOLUME};
use crate::audio::{EngineError, ToneEngine};
use std::time::Instant;

/// Countdown in progress together with what to do when it ends.
#[derive(Debug)]
struct PendingStart {
    countdown: Countdown,
    mode: SessionMode,
}

/// Keeps the status snapshot and queues events for the UI.
#[derive(Debug, Default)]
struct StatusBoard {
    status: PlaybackStatus,
    pending: Vec<PlaybackEvent>,
}

impl PlaybackObserver for StatusBoard {
    fn notify(&mut self, event: PlaybackEvent) {
        self.status.apply(event);
        self.pending.push(event);
    }
}

/// A metronome playing a [`Pattern`] through a [`ToneEngine`].
pub struct Metronome<E: ToneEngine> {
    engine: E,
    pattern: Pattern,
    bpm: u32,
    volume: f32,
    countdown_enabled: bool,
    scheduler: BeatScheduler,
    pending_start: Option<PendingStart>,
    board: StatusBoard,
}

impl<E: ToneEngine> Metronome<E> {
    /// Creates an idle metronome with default settings and an empty pattern.
    ///
    /// The engine is not initialized until the first [`start`](Self::start).
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            pattern: Pattern::new(),
            bpm: DEFAULT_BPM,
            volume: DEFAULT_VOLUME,
            countdown_enabled: true,
            scheduler: BeatScheduler::new(),
            pending_start: None,
            board: StatusBoard::default(),
        }
    }

    /// The tone engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The pattern that will play on the next start.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Tempo in beats per minute.
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Output volume in [0, 1].
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Whether starting plays the 4-beat lead-in first.
    pub fn countdown_enabled(&self) -> bool {
        self.countdown_enabled
    }

    /// Snapshot of the playback state.
    pub fn status(&self) -> PlaybackStatus {
        self.board.status
    }

    /// Returns true while a countdown or playback is running.
    pub fn is_active(&self) -> bool {
        self.pending_start.is_some() || self.scheduler.is_running()
    }

    /// Takes the events published since the last call.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.board.pending)
    }

    /// The earliest pending timer deadline, if anything is running.
    pub fn next_deadline(&self) -> Option<Instant> {
        let countdown = self
            .pending_start
            .as_ref()
            .and_then(|p| p.countdown.next_deadline());
        match (countdown, self.scheduler.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Starts a session, stopping any session already running.
    ///
    /// With the countdown enabled, the lead-in plays first and the pattern
    /// starts from [`tick`](Self::tick) once it ends. A
    /// [`PlaybackEvent::SessionStarted`] carrying `mode` is published when
    /// the pattern actually starts.
    ///
    /// # Errors
    ///
    /// Returns error if the tone engine cannot be initialized. The metronome
    /// stays idle in that case.
    pub fn start(&mut self, mode: SessionMode, now: Instant) -> Result<(), EngineError> {
        self.stop();

        if let Err(e) = self.engine.initialize() {
            tracing::warn!("Cannot start playback: {}", e);
            return Err(e);
        }
        self.engine.set_volume(self.volume);

        if self.countdown_enabled {
            let countdown = Countdown::begin(&self.engine, self.bpm, now, &mut self.board);
            self.pending_start = Some(PendingStart { countdown, mode });
        } else {
            let at_time = self.engine.current_time();
            self.begin_playback(at_time, mode, now);
        }
        Ok(())
    }

    /// Stops the countdown and playback. Does nothing when idle.
    ///
    /// Clicks already queued on the engine are left to ring out.
    pub fn stop(&mut self) {
        let was_counting = match self.pending_start.take() {
            Some(mut pending) => {
                pending.countdown.cancel();
                true
            }
            None => false,
        };
        let was_running = self.scheduler.stop();

        if was_counting || was_running {
            self.board.notify(PlaybackEvent::Stopped);
            tracing::info!("Playback stopped");
        }
    }

    /// Drives the countdown and scheduler timers. Call at least every few
    /// milliseconds while active.
    pub fn tick(&mut self, now: Instant) {
        if let Some(pending) = self.pending_start.as_mut() {
            if let Some(downbeat) = pending.countdown.tick(now, &mut self.board) {
                let mode = pending.mode;
                self.pending_start = None;
                self.begin_playback(downbeat, mode, now);
            }
        }
        self.scheduler.poll(now, &self.engine, &mut self.board);
    }

    fn begin_playback(&mut self, at_time: f64, mode: SessionMode, now: Instant) {
        self.scheduler
            .start(at_time, now, &self.pattern, self.bpm, &self.engine, &mut self.board);
        self.board.notify(PlaybackEvent::SessionStarted(mode));
        tracing::info!("Playback started ({:?}) at {} bpm", mode, self.bpm);
    }

    /// Stops a running session after an edit that invalidates it.
    fn stop_for_edit(&mut self, what: &str) {
        if self.is_active() {
            tracing::debug!("{} changed while playing, stopping", what);
            self.stop();
        }
    }

    /// Sets the tempo, clamped to the supported range.
    ///
    /// # Returns
    ///
    /// The tempo actually applied.
    pub fn set_bpm(&mut self, bpm: i64) -> u32 {
        let bpm = clamp_bpm(bpm);
        if bpm != self.bpm {
            self.bpm = bpm;
            self.stop_for_edit("Tempo");
        }
        self.bpm
    }

    /// Sets the output volume, clamped to [0, 1]. Takes effect immediately
    /// and never interrupts playback.
    ///
    /// # Returns
    ///
    /// The volume actually applied.
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        self.volume = clamp_volume(volume);
        self.engine.set_volume(self.volume);
        self.volume
    }

    /// Enables or disables the lead-in for the next start.
    pub fn set_countdown_enabled(&mut self, enabled: bool) {
        self.countdown_enabled = enabled;
    }

    /// Cycles one cell through Off → Normal → Accent.
    ///
    /// # Returns
    ///
    /// The new state, or None if the cell is out of range.
    pub fn cycle_cell(&mut self, measure: usize, beat: usize) -> Option<ClickState> {
        let state = self.pattern.cycle_cell(measure, beat)?;
        self.stop_for_edit("Pattern");
        Some(state)
    }

    /// Sets one cell.
    pub fn set_cell(&mut self, measure: usize, beat: usize, state: ClickState) {
        if self.pattern.set_cell(measure, beat, state) {
            self.stop_for_edit("Pattern");
        }
    }

    /// Sets the number of measures, clamped to the grid size.
    ///
    /// # Returns
    ///
    /// The measure count actually applied.
    pub fn set_num_measures(&mut self, measures: usize) -> usize {
        if self.pattern.set_num_measures(measures) {
            self.stop_for_edit("Measure count");
        }
        self.pattern.num_measures()
    }

    /// Sets the beat count of one measure, clamped to the grid size.
    ///
    /// # Returns
    ///
    /// The beat count actually applied (0 for an out-of-range measure).
    pub fn set_beats_per_measure(&mut self, measure: usize, beats: usize) -> usize {
        if self.pattern.set_beats(measure, beats) {
            self.stop_for_edit("Beats per measure");
        }
        self.pattern.beats_in(measure)
    }

    /// Replaces the whole pattern (e.g. from a preset).
    pub fn load_pattern(&mut self, pattern: Pattern) {
        if pattern != self.pattern {
            self.pattern = pattern;
            self.stop_for_edit("Pattern");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::manual::ManualEngine;
    use crate::audio::Timbre;
    use crate::metronome::{Cursor, COUNTDOWN_LEAD_SECONDS, POLL_INTERVAL, SCHEDULE_AHEAD_SECONDS};
    use std::time::Duration;

    fn metronome() -> Metronome<ManualEngine> {
        let mut m = Metronome::new(ManualEngine::new());
        m.set_countdown_enabled(false);
        m.set_bpm(120);
        m.set_num_measures(1);
        m.set_cell(0, 0, ClickState::Accent);
        m.set_cell(0, 1, ClickState::Normal);
        m.set_cell(0, 3, ClickState::Normal);
        m
    }

    #[test]
    fn test_defaults() {
        let m = Metronome::new(ManualEngine::new());
        assert_eq!(m.bpm(), DEFAULT_BPM);
        assert_eq!(m.volume(), DEFAULT_VOLUME);
        assert!(m.countdown_enabled());
        assert!(!m.engine().is_initialized());
        assert_eq!(m.status(), PlaybackStatus::default());
    }

    #[test]
    fn test_start_without_countdown() {
        let mut m = metronome();
        let t0 = Instant::now();
        m.start(SessionMode::Play, t0).unwrap();

        assert!(m.engine().is_initialized());
        assert_eq!(m.engine().clicks(), vec![(Timbre::Accent, 0.0)]);
        let status = m.status();
        assert!(status.is_playing);
        assert_eq!(status.position(), Some(Cursor::ORIGIN));
        assert_eq!(status.countdown, 0);
        assert_eq!(
            m.drain_events(),
            vec![
                PlaybackEvent::Position(Cursor::ORIGIN),
                PlaybackEvent::SessionStarted(SessionMode::Play),
            ]
        );
        assert!(m.drain_events().is_empty());
        assert_eq!(m.next_deadline(), Some(t0 + POLL_INTERVAL));
    }

    #[test]
    fn test_countdown_hands_off_to_scheduler() {
        let mut m = metronome();
        m.set_countdown_enabled(true);
        let t0 = Instant::now();
        m.start(SessionMode::Record, t0).unwrap();

        let lead = COUNTDOWN_LEAD_SECONDS;
        assert_eq!(m.status().countdown, 4);
        assert!(!m.status().is_playing);
        assert_eq!(m.engine().clicks().len(), 4);

        for (k, shown) in [(1u32, 3u8), (2, 2), (3, 1)] {
            m.tick(t0 + Duration::from_millis(500) * k);
            assert_eq!(m.status().countdown, shown);
        }

        m.engine().now.set(2.0);
        m.tick(t0 + Duration::from_secs(2));
        assert_eq!(m.status().countdown, 0);
        assert!(m.status().is_playing);
        let events = m.drain_events();
        assert_eq!(
            events.last(),
            Some(&PlaybackEvent::SessionStarted(SessionMode::Record))
        );

        // The downbeat lands one beat after the last countdown click
        m.engine().now.set(2.0 + SCHEDULE_AHEAD_SECONDS / 2.0);
        m.tick(t0 + Duration::from_secs(2) + POLL_INTERVAL);
        let clicks = m.engine().clicks();
        assert_eq!(clicks.len(), 5);
        assert_eq!(clicks[3], (Timbre::Accent, lead + 1.5));
        assert_eq!(clicks[4], (Timbre::Accent, lead + 2.0));
        assert_eq!(m.status().position(), Some(Cursor::ORIGIN));
    }

    #[test]
    fn test_stop_during_countdown_never_starts() {
        let mut m = metronome();
        m.set_countdown_enabled(true);
        let t0 = Instant::now();
        m.start(SessionMode::Play, t0).unwrap();
        m.tick(t0 + Duration::from_millis(500));

        m.stop();
        assert_eq!(m.status(), PlaybackStatus::default());
        assert_eq!(m.next_deadline(), None);

        for s in 1..10 {
            m.engine().now.set(s as f64);
            m.tick(t0 + Duration::from_secs(s));
        }
        assert!(!m
            .drain_events()
            .iter()
            .any(|e| matches!(e, PlaybackEvent::SessionStarted(_))));
        // Only the countdown clicks were ever queued
        assert_eq!(m.engine().clicks().len(), 4);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut m = metronome();
        m.stop();
        assert!(m.drain_events().is_empty());
        assert_eq!(m.status(), PlaybackStatus::default());

        m.start(SessionMode::Play, Instant::now()).unwrap();
        m.stop();
        m.drain_events();
        m.stop();
        assert!(m.drain_events().is_empty());
        let status = m.status();
        assert!(!status.is_playing);
        assert_eq!(status.current_measure, None);
        assert_eq!(status.current_beat, None);
        assert_eq!(status.countdown, 0);
    }

    #[test]
    fn test_edits_stop_playback() {
        let t0 = Instant::now();
        let edits: [fn(&mut Metronome<ManualEngine>); 6] = [
            |m| {
                m.set_bpm(100);
            },
            |m| {
                m.cycle_cell(0, 2);
            },
            |m| m.set_cell(0, 0, ClickState::Normal),
            |m| {
                m.set_num_measures(3);
            },
            |m| {
                m.set_beats_per_measure(0, 7);
            },
            |m| {
                let mut pattern = m.pattern().clone();
                pattern.set_cell(5, 5, ClickState::Accent);
                m.load_pattern(pattern);
            },
        ];

        for (i, edit) in edits.iter().enumerate() {
            let mut m = metronome();
            m.start(SessionMode::Play, t0).unwrap();
            edit(&mut m);
            assert!(!m.is_active(), "edit {} did not stop playback", i);
            assert_eq!(m.drain_events().last(), Some(&PlaybackEvent::Stopped));
        }
    }

    #[test]
    fn test_edits_stop_countdown() {
        let mut m = metronome();
        m.set_countdown_enabled(true);
        m.start(SessionMode::Play, Instant::now()).unwrap();
        m.set_bpm(90);
        assert!(!m.is_active());
        assert_eq!(m.status().countdown, 0);
    }

    #[test]
    fn test_non_edits_keep_playing() {
        let mut m = metronome();
        m.start(SessionMode::Play, Instant::now()).unwrap();

        m.set_volume(0.2);
        m.set_countdown_enabled(true);
        m.set_bpm(120);
        m.set_cell(0, 0, ClickState::Accent);
        m.set_num_measures(1);
        assert!(m.is_active());
        assert!((m.engine().volume.get() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_setters_clamp() {
        let mut m = metronome();
        assert_eq!(m.set_bpm(10), 30);
        assert_eq!(m.set_bpm(1000), 300);
        assert_eq!(m.set_volume(2.0), 1.0);
        assert_eq!(m.set_volume(-1.0), 0.0);
        assert_eq!(m.set_num_measures(0), 1);
        assert_eq!(m.set_num_measures(12), 8);
        assert_eq!(m.set_beats_per_measure(2, 0), 1);
        assert_eq!(m.set_beats_per_measure(2, 40), 16);
        assert_eq!(m.set_beats_per_measure(8, 4), 0);
        assert_eq!(m.cycle_cell(0, 16), None);
    }

    #[test]
    fn test_volume_applied_on_start() {
        let mut m = metronome();
        m.set_volume(0.4);
        m.start(SessionMode::Play, Instant::now()).unwrap();
        assert!((m.engine().volume.get() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_initialize_failure_leaves_idle() {
        let mut m = Metronome::new(ManualEngine::broken());
        assert!(m.start(SessionMode::Play, Instant::now()).is_err());
        assert!(!m.is_active());
        assert_eq!(m.status(), PlaybackStatus::default());
        assert!(m.drain_events().is_empty());
    }

    #[test]
    fn test_restart_resets_session() {
        let mut m = metronome();
        let t0 = Instant::now();
        m.start(SessionMode::Play, t0).unwrap();
        m.engine().now.set(1.0);
        m.tick(t0 + POLL_INTERVAL);
        assert_ne!(m.status().position(), Some(Cursor::ORIGIN));
        m.drain_events();

        m.start(SessionMode::Play, t0 + Duration::from_secs(1)).unwrap();
        let events = m.drain_events();
        assert_eq!(events[0], PlaybackEvent::Stopped);
        assert_eq!(events[1], PlaybackEvent::Position(Cursor::ORIGIN));
        assert_eq!(m.engine().clicks().last(), Some(&(Timbre::Accent, 1.0)));
    }

    #[test]
    fn test_edits_while_idle_keep_status() {
        let mut m = metronome();
        m.set_bpm(200);
        m.cycle_cell(0, 2);
        assert!(m.drain_events().is_empty());
        assert_eq!(m.pattern().cell(0, 2), ClickState::Normal);
    }
}
