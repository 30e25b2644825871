//! Session capture.
//!
//! Records whatever the tone engine renders while armed and writes it out as
//! a WAV file when the capture is stopped. Capture is a sidecar: nothing in
//! the metronome depends on it, and its failures never affect playback.

use super::voice::SAMPLE_RATE;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur while capturing a session.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// `start` was called while a capture was already running.
    #[error("a recording is already in progress")]
    AlreadyRecording,
    /// The shared capture buffer was poisoned by a panicking audio thread.
    #[error("capture buffer is unavailable")]
    BufferUnavailable,
    /// Writing the WAV file failed.
    #[error("failed to write recording {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

/// Shared buffer the audio output appends rendered samples to while armed.
///
/// Cloning yields another handle to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureTap {
    buffer: Arc<Mutex<Option<Vec<f32>>>>,
}

impl CaptureTap {
    /// Creates a disarmed tap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts collecting samples, discarding anything collected before.
    pub fn arm(&self) -> Result<(), CaptureError> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| CaptureError::BufferUnavailable)?;
        *buffer = Some(Vec::new());
        Ok(())
    }

    /// Stops collecting and returns the collected samples.
    pub fn disarm(&self) -> Result<Vec<f32>, CaptureError> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| CaptureError::BufferUnavailable)?;
        Ok(buffer.take().unwrap_or_default())
    }

    /// Returns true while samples are being collected.
    pub fn is_armed(&self) -> bool {
        self.buffer.lock().map(|b| b.is_some()).unwrap_or(false)
    }

    /// Appends rendered samples if armed. Called from the audio thread, so a
    /// poisoned lock is silently skipped.
    pub fn push(&self, samples: &[f32]) {
        if let Ok(mut buffer) = self.buffer.lock() {
            if let Some(buf) = buffer.as_mut() {
                buf.extend_from_slice(samples);
            }
        }
    }
}

/// Format of every WAV file written by the application: 16-bit mono PCM.
pub(crate) fn wav_spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Converts an f32 sample (-1.0 to 1.0) to 16-bit PCM.
pub(crate) fn to_pcm16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Writes mono samples as a 16-bit WAV file.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32]) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path.as_ref(), wav_spec())?;
    for &sample in samples {
        writer.write_sample(to_pcm16(sample))?;
    }
    writer.finalize()
}

/// Turns tap contents into recording files.
#[derive(Debug)]
pub struct Recorder {
    tap: CaptureTap,
    output_dir: PathBuf,
    recording: bool,
}

impl Recorder {
    /// Creates a recorder that writes into `output_dir`.
    pub fn new(tap: CaptureTap, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            tap,
            output_dir: output_dir.into(),
            recording: false,
        }
    }

    /// Returns true while a capture is running.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Directory recordings are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Arms the tap.
    ///
    /// # Errors
    ///
    /// Returns error if a capture is already running or the tap is unusable.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.recording {
            return Err(CaptureError::AlreadyRecording);
        }
        self.tap.arm()?;
        self.recording = true;
        tracing::info!("Recording started");
        Ok(())
    }

    /// Disarms the tap and writes the captured audio.
    ///
    /// # Returns
    ///
    /// The path of the written file, or None if nothing was running or
    /// nothing was captured.
    ///
    /// # Errors
    ///
    /// Returns error if the tap is unusable or the file cannot be written.
    pub fn stop(&mut self) -> Result<Option<PathBuf>, CaptureError> {
        if !self.recording {
            return Ok(None);
        }
        self.recording = false;
        let samples = self.tap.disarm()?;
        if samples.is_empty() {
            tracing::info!("Recording stopped with no audio captured");
            return Ok(None);
        }

        let path = self.next_path();
        write_wav(&path, &samples).map_err(|source| CaptureError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!(
            "Saved recording {:?} ({:.1}s)",
            path,
            samples.len() as f64 / SAMPLE_RATE as f64
        );
        Ok(Some(path))
    }

    /// Picks a file name that does not exist yet.
    fn next_path(&self) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut path = self.output_dir.join(format!("clicktui-{}.wav", stamp));
        let mut n = 1;
        while path.exists() {
            path = self
                .output_dir
                .join(format!("clicktui-{}-{}.wav", stamp, n));
            n += 1;
        }
        path
    }
}
