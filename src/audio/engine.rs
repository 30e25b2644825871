//! Tone engine for sample-accurate click playback.
//!
//! The [`ToneEngine`] trait is the only surface the metronome needs from the
//! audio subsystem. [`AudioEngine`] implements it on top of rodio, and
//! [`OfflineEngine`] implements it for rendering straight into memory.

use super::capture::CaptureTap;
use super::voice::{frame_to_seconds, seconds_to_frame, ClickRenderer, Timbre, SAMPLE_RATE};
use rodio::{OutputStream, OutputStreamHandle, Source};
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Audio buffer size in frames for low-latency playback.
/// Smaller = lower latency but higher CPU usage.
const BUFFER_SIZE: usize = 256;

/// Errors reported by tone engine initialization.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No usable audio output device.
    #[error("failed to open audio output: {0}")]
    OutputUnavailable(String),
    /// The device refused the click stream.
    #[error("failed to start audio playback: {0}")]
    PlaybackFailed(String),
}

/// An audio backend able to play clicks at exact future times.
///
/// Any backend with its own monotonic clock and true future scheduling can
/// drive the metronome.
pub trait ToneEngine {
    /// Creates the output graph. Idempotent: later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns error if the audio output cannot be opened. The engine stays
    /// uninitialized in that case.
    fn initialize(&mut self) -> Result<(), EngineError>;

    /// Returns true once [`initialize`](Self::initialize) has succeeded.
    fn is_initialized(&self) -> bool;

    /// Reads the engine clock in seconds.
    ///
    /// # Panics
    ///
    /// Panics if the engine is not initialized.
    fn current_time(&self) -> f64;

    /// Sets the master output gain, clamped to [0, 1]. Applies immediately.
    fn set_volume(&self, volume: f32);

    /// Queues a click to start at `at_time` on the engine clock.
    ///
    /// # Panics
    ///
    /// Panics if the engine is not initialized.
    fn schedule_click(&self, timbre: Timbre, at_time: f64);
}

/// State shared between the engine handle and the audio source.
struct SharedState {
    /// The click synthesizer (also owns the master gain).
    renderer: Mutex<ClickRenderer>,
    /// Frames handed to the output so far. Mirrors the renderer's frame
    /// counter so the clock can be read without taking the lock.
    frames_rendered: AtomicU64,
}

/// Audio source that pulls samples from the click renderer.
/// Implements rodio's Source trait for playback.
struct ClickSource {
    state: Arc<SharedState>,
    capture: CaptureTap,
    buf: Vec<f32>,
    buf_pos: usize,
}

impl ClickSource {
    fn new(state: Arc<SharedState>, capture: CaptureTap) -> Self {
        Self {
            state,
            capture,
            buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
        }
    }
}

impl Iterator for ClickSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= BUFFER_SIZE {
            if let Ok(mut renderer) = self.state.renderer.lock() {
                renderer.render(&mut self.buf);
                self.state
                    .frames_rendered
                    .store(renderer.frame(), Ordering::Release);
            } else {
                // Only fill with silence if we can't get the lock
                self.buf.fill(0.0);
            }
            self.capture.push(&self.buf);
            self.buf_pos = 0;
        }

        let sample = self.buf[self.buf_pos];
        self.buf_pos += 1;
        Some(sample)
    }
}

impl Source for ClickSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// Keeps the rodio stream alive for as long as the engine lives.
struct Output {
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
}

/// Real-time tone engine backed by the default rodio output device.
///
/// Nothing touches the audio device until [`ToneEngine::initialize`] runs,
/// so construction is cheap and infallible.
pub struct AudioEngine {
    state: Arc<SharedState>,
    capture: CaptureTap,
    output: Option<Output>,
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine {
    /// Creates an engine that has not yet opened the audio device.
    pub fn new() -> Self {
        Self {
            state: Arc::new(SharedState {
                renderer: Mutex::new(ClickRenderer::new()),
                frames_rendered: AtomicU64::new(0),
            }),
            capture: CaptureTap::new(),
            output: None,
        }
    }

    /// Returns a handle to the tap that sees every rendered sample.
    pub fn capture_tap(&self) -> CaptureTap {
        self.capture.clone()
    }

    fn assert_initialized(&self, operation: &str) {
        assert!(
            self.output.is_some(),
            "AudioEngine::{} called before initialize()",
            operation
        );
    }
}

impl ToneEngine for AudioEngine {
    fn initialize(&mut self) -> Result<(), EngineError> {
        if self.output.is_some() {
            return Ok(());
        }

        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| EngineError::OutputUnavailable(e.to_string()))?;

        let source = ClickSource::new(Arc::clone(&self.state), self.capture.clone());
        stream_handle
            .play_raw(source)
            .map_err(|e| EngineError::PlaybackFailed(e.to_string()))?;

        tracing::info!("Audio output initialized at {} Hz", SAMPLE_RATE);
        self.output = Some(Output {
            _stream: stream,
            _stream_handle: stream_handle,
        });
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.output.is_some()
    }

    fn current_time(&self) -> f64 {
        self.assert_initialized("current_time");
        frame_to_seconds(self.state.frames_rendered.load(Ordering::Acquire))
    }

    fn set_volume(&self, volume: f32) {
        if let Ok(mut renderer) = self.state.renderer.lock() {
            renderer.set_gain(volume);
        }
    }

    fn schedule_click(&self, timbre: Timbre, at_time: f64) {
        self.assert_initialized("schedule_click");
        if let Ok(mut renderer) = self.state.renderer.lock() {
            renderer.schedule(timbre, seconds_to_frame(at_time));
        }
    }
}

/// Tone engine that renders into memory on demand.
///
/// The clock only advances when [`render`](Self::render) is called, which
/// makes it suitable for export and for deterministic tests.
#[derive(Debug, Default)]
pub struct OfflineEngine {
    renderer: RefCell<ClickRenderer>,
    initialized: bool,
    /// Clicks at or after this time are dropped.
    horizon: Option<f64>,
}

impl OfflineEngine {
    /// Creates an uninitialized offline engine at time 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every click scheduled at or after `horizon` seconds.
    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Renders `buf.len()` frames, advancing the clock.
    pub fn render(&self, buf: &mut [f32]) {
        self.renderer.borrow_mut().render(buf);
    }

    /// Frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.renderer.borrow().frame()
    }
}

impl ToneEngine for OfflineEngine {
    fn initialize(&mut self) -> Result<(), EngineError> {
        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn current_time(&self) -> f64 {
        assert!(self.initialized, "OfflineEngine::current_time called before initialize()");
        frame_to_seconds(self.frame())
    }

    fn set_volume(&self, volume: f32) {
        self.renderer.borrow_mut().set_gain(volume);
    }

    fn schedule_click(&self, timbre: Timbre, at_time: f64) {
        assert!(self.initialized, "OfflineEngine::schedule_click called before initialize()");
        if self.horizon.is_some_and(|h| at_time >= h) {
            return;
        }
        self.renderer
            .borrow_mut()
            .schedule(timbre, seconds_to_frame(at_time));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_engine_starts_uninitialized() {
        let engine = AudioEngine::new();
        assert!(!engine.is_initialized());
        // Volume may be set before the device exists
        engine.set_volume(0.3);
        assert!((engine.state.renderer.lock().unwrap().gain() - 0.3).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "before initialize")]
    fn test_audio_engine_clock_requires_initialize() {
        let engine = AudioEngine::new();
        engine.current_time();
    }

    #[test]
    #[should_panic(expected = "before initialize")]
    fn test_audio_engine_schedule_requires_initialize() {
        let engine = AudioEngine::new();
        engine.schedule_click(Timbre::Accent, 0.0);
    }

    #[test]
    fn test_click_source_feeds_capture() {
        let state = Arc::new(SharedState {
            renderer: Mutex::new(ClickRenderer::new()),
            frames_rendered: AtomicU64::new(0),
        });
        let tap = CaptureTap::new();
        tap.arm().unwrap();
        state.renderer.lock().unwrap().schedule(Timbre::Accent, 0);

        let source = ClickSource::new(Arc::clone(&state), tap.clone());
        let pulled: Vec<f32> = source.take(BUFFER_SIZE * 2).collect();

        assert_eq!(
            state.frames_rendered.load(Ordering::Acquire),
            (BUFFER_SIZE * 2) as u64
        );
        assert_eq!(tap.disarm().unwrap(), pulled);
        assert!(pulled.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_offline_clock_follows_rendering() {
        let mut engine = OfflineEngine::new();
        engine.initialize().unwrap();
        engine.initialize().unwrap();
        assert_eq!(engine.current_time(), 0.0);

        let mut buf = vec![0.0; SAMPLE_RATE as usize / 2];
        engine.render(&mut buf);
        assert!((engine.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_offline_horizon_drops_late_clicks() {
        let mut engine = OfflineEngine::new().with_horizon(0.01);
        engine.initialize().unwrap();
        engine.schedule_click(Timbre::Accent, 0.02);
        assert_eq!(engine.renderer.borrow().pending_count(), 0);
        engine.schedule_click(Timbre::Accent, 0.005);
        assert_eq!(engine.renderer.borrow().pending_count(), 1);
    }
}
