//! clicktui - A terminal-based pattern metronome.
//!
//! This library provides the core functionality for the metronome app:
//! a lookahead beat scheduler that drives a sample-accurate tone engine,
//! a count-in sequencer, presets, session recording and WAV export.

pub mod app;
pub mod audio;
pub mod metronome;
pub mod ui;

// Re-export commonly used types
pub use app::{App, FocusedPanel};
pub use audio::{export_to_wav, AudioEngine, OfflineEngine, Timbre, ToneEngine};
pub use metronome::{
    ClickState, Cursor, Metronome, Pattern, PlaybackEvent, PlaybackObserver, PlaybackStatus,
    Preset, PresetLibrary, SessionMode,
};
