//! Audio output, click synthesis and capture.
//!
//! This module provides sample-accurate click playback. It supports:
//! - A tone engine trait with a real-time rodio backend and an offline backend
//! - Two synthesized click timbres with a short attack/decay envelope
//! - Tapping the rendered output for session recording
//! - WAV export of a pattern

pub mod capture;
pub mod engine;
pub mod export;
pub mod voice;

#[cfg(test)]
pub(crate) mod manual;

pub use capture::{CaptureError, CaptureTap, Recorder};
pub use engine::{AudioEngine, EngineError, OfflineEngine, ToneEngine};
pub use export::{export_to_wav, ExportError};
pub use voice::{Timbre, SAMPLE_RATE};
