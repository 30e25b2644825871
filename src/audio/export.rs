//! Audio export functionality.
//!
//! Renders a number of passes through a pattern to a WAV file. The export
//! runs the same [`BeatScheduler`] as live playback, fed by a virtual poll
//! timer over an [`OfflineEngine`], so the file contains exactly what the
//! speakers would have played.

use super::capture::{to_pcm16, wav_spec};
use super::engine::{EngineError, OfflineEngine, ToneEngine};
use super::voice::{seconds_to_frame, CLICK_SECONDS};
use crate::metronome::{
    clamp_bpm, clamp_volume, seconds_per_beat, BeatScheduler, Pattern, PlaybackEvent,
    PlaybackObserver, POLL_INTERVAL,
};
use hound::WavWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Errors that can occur during export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("offline engine failed: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to write WAV file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
}

/// Export has no UI to tell about cursor movement.
struct Discard;

impl PlaybackObserver for Discard {
    fn notify(&mut self, _event: PlaybackEvent) {}
}

/// Exports `loops` passes through a pattern to a WAV file.
///
/// The file ends once the last click of the final pass has decayed; the
/// downbeat of the pass after it is not included.
///
/// # Arguments
///
/// * `pattern` - Pattern to render
/// * `bpm` - Tempo, clamped to the supported range
/// * `volume` - Output volume, clamped to [0, 1]
/// * `loops` - Number of passes through the pattern (at least 1)
/// * `output_path` - Path for the output WAV file
/// * `progress_callback` - Optional callback for progress updates (0.0 to 1.0)
///
/// # Returns
///
/// Number of frames written
///
/// # Errors
///
/// Returns error if the output file cannot be created or written
pub fn export_to_wav<P, F>(
    pattern: &Pattern,
    bpm: i64,
    volume: f32,
    loops: u32,
    output_path: P,
    mut progress_callback: Option<F>,
) -> Result<u64, ExportError>
where
    P: AsRef<Path>,
    F: FnMut(f32),
{
    let path = output_path.as_ref();
    let write_error = |source: hound::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let bpm = clamp_bpm(bpm);
    let beats = pattern.cycle_length() as u64 * loops.max(1) as u64;
    let music_seconds = beats as f64 * seconds_per_beat(bpm);
    let total_frames = seconds_to_frame(music_seconds + CLICK_SECONDS as f64);

    let mut engine = OfflineEngine::new().with_horizon(music_seconds);
    engine.initialize()?;
    engine.set_volume(clamp_volume(volume));

    let mut writer = WavWriter::create(path, wav_spec()).map_err(write_error)?;

    // Host time is virtual: each poll is followed by one poll period of audio
    let mut now = Instant::now();
    let mut scheduler = BeatScheduler::new();
    scheduler.start(0.0, now, pattern, bpm, &engine, &mut Discard);

    let chunk_frames = seconds_to_frame(POLL_INTERVAL.as_secs_f64()) as usize;
    let mut buf = vec![0.0f32; chunk_frames];
    let mut written = 0u64;

    while written < total_frames {
        let frames = (total_frames - written).min(chunk_frames as u64) as usize;
        engine.render(&mut buf[..frames]);
        for &sample in &buf[..frames] {
            writer.write_sample(to_pcm16(sample)).map_err(write_error)?;
        }
        written += frames as u64;

        now += POLL_INTERVAL;
        scheduler.poll(now, &engine, &mut Discard);

        if let Some(ref mut callback) = progress_callback {
            callback(written as f32 / total_frames as f32);
        }
    }

    writer.finalize().map_err(write_error)?;
    tracing::info!(
        "Exported {} beats at {} bpm to {} ({} frames)",
        beats,
        bpm,
        path.display(),
        written
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SAMPLE_RATE;
    use crate::metronome::ClickState;

    fn read_samples(path: &Path) -> (hound::WavSpec, Vec<i16>) {
        let mut reader = hound::WavReader::open(path).unwrap();
        let spec = reader.spec();
        let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        (spec, samples)
    }

    fn one_bar() -> Pattern {
        let mut pattern = Pattern::new();
        pattern.set_num_measures(1);
        pattern.set_cell(0, 0, ClickState::Accent);
        pattern.set_cell(0, 1, ClickState::Normal);
        pattern.set_cell(0, 3, ClickState::Normal);
        pattern
    }

    fn frame(seconds: f64) -> usize {
        seconds_to_frame(seconds) as usize
    }

    #[test]
    fn test_export_one_bar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bar.wav");

        let frames = export_to_wav(&one_bar(), 120, 1.0, 1, &path, None::<fn(f32)>).unwrap();
        assert_eq!(frames, seconds_to_frame(2.0 + CLICK_SECONDS as f64));

        let (spec, samples) = read_samples(&path);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(samples.len() as u64, frames);

        let loud = |from: f64, to: f64| samples[frame(from)..frame(to)].iter().any(|&s| s != 0);
        assert!(loud(0.0, 0.05));
        assert!(loud(0.5, 0.55));
        // Beat 2 is off
        assert!(!loud(1.06, 1.49));
        assert!(loud(1.5, 1.55));
        // The next pass's downbeat is not rendered
        assert!(!loud(1.56, 2.0));
        assert!(!loud(2.0, 2.0 + CLICK_SECONDS as f64));
    }

    #[test]
    fn test_export_loops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loops.wav");

        let frames = export_to_wav(&one_bar(), 120, 0.5, 3, &path, None::<fn(f32)>).unwrap();
        assert_eq!(frames, seconds_to_frame(6.0 + CLICK_SECONDS as f64));

        let (_, samples) = read_samples(&path);
        for pass in 0..3 {
            let start = frame(pass as f64 * 2.0);
            assert!(samples[start..start + 400].iter().any(|&s| s != 0), "pass {}", pass);
        }
    }

    #[test]
    fn test_zero_loops_renders_one_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.wav");
        let frames = export_to_wav(&one_bar(), 120, 1.0, 0, &path, None::<fn(f32)>).unwrap();
        assert_eq!(frames, seconds_to_frame(2.0 + CLICK_SECONDS as f64));
    }

    #[test]
    fn test_silent_at_zero_volume() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silent.wav");
        export_to_wav(&one_bar(), 200, 0.0, 1, &path, None::<fn(f32)>).unwrap();
        let (_, samples) = read_samples(&path);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_progress_reaches_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.wav");
        let mut seen = Vec::new();
        export_to_wav(&one_bar(), 300, 1.0, 1, &path, Some(|p: f32| seen.push(p))).unwrap();

        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        let result = export_to_wav(&one_bar(), 120, 1.0, 1, &path, None::<fn(f32)>);
        assert!(matches!(result, Err(ExportError::Write { .. })));
    }
}
