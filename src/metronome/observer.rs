//! Playback notifications for the presentation layer.

use super::pattern::Cursor;

/// Why a session was started. Decides what the capture sidecar does once
/// playback actually begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Plain playback.
    Play,
    /// Playback with the output being recorded.
    Record,
}

/// Something the metronome wants the UI to know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The beat about to sound; published when it is queued, which may be
    /// up to one lookahead horizon before it is heard.
    Position(Cursor),
    /// Countdown value (4, 3, 2, 1, then 0 when the countdown ends).
    Countdown(u8),
    /// The scheduler started playing the pattern.
    SessionStarted(SessionMode),
    /// Playback or countdown was stopped.
    Stopped,
}

/// Receives playback notifications.
pub trait PlaybackObserver {
    fn notify(&mut self, event: PlaybackEvent);
}

impl PlaybackObserver for Vec<PlaybackEvent> {
    fn notify(&mut self, event: PlaybackEvent) {
        self.push(event);
    }
}

/// Snapshot of the outbound playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    /// True while the beat scheduler runs (not during the countdown).
    pub is_playing: bool,
    pub current_measure: Option<usize>,
    pub current_beat: Option<usize>,
    /// Remaining countdown clicks, 0 when no countdown is running.
    pub countdown: u8,
}

impl PlaybackStatus {
    /// Returns true while either the countdown or playback is running.
    pub fn is_active(&self) -> bool {
        self.is_playing || self.countdown > 0
    }

    /// The published cursor, if any.
    pub fn position(&self) -> Option<Cursor> {
        match (self.current_measure, self.current_beat) {
            (Some(measure), Some(beat)) => Some(Cursor::new(measure, beat)),
            _ => None,
        }
    }

    /// Folds an event into the snapshot.
    pub fn apply(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Position(cursor) => {
                self.current_measure = Some(cursor.measure);
                self.current_beat = Some(cursor.beat);
            }
            PlaybackEvent::Countdown(value) => self.countdown = value,
            PlaybackEvent::SessionStarted(_) => self.is_playing = true,
            PlaybackEvent::Stopped => *self = Self::default(),
        }
    }
}
