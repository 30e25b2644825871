//! Application state and event handling.
//!
//! This module defines the main application state that coordinates
//! between the metronome, the recorder, the preset library and the TUI.

use crate::audio::{AudioEngine, CaptureTap, Recorder, ToneEngine};
use crate::metronome::{
    ClickState, Cursor, Metronome, PlaybackEvent, PresetLibrary, SessionMode,
};
use ratatui::layout::Rect;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a status message stays visible.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Longest the event loop may sleep, so the UI keeps redrawing.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Tempo step for the coarse tempo keys.
pub const BPM_COARSE_STEP: i64 = 10;

/// Volume step for the volume keys.
pub const VOLUME_STEP: f32 = 0.05;

/// Width of the measure labels in the click grid.
pub const GRID_LABEL_WIDTH: u16 = 5;

/// Width of one beat cell in the click grid.
pub const CELL_WIDTH: u16 = 4;

/// Maximum length of a preset name.
pub const MAX_PRESET_NAME: usize = 32;

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusedPanel {
    /// The click grid.
    #[default]
    Grid,
    /// The preset list.
    Presets,
}

/// State for the save-preset dialog.
#[derive(Debug, Clone, Default)]
pub struct PresetDialogState {
    /// Whether the dialog is open.
    pub open: bool,
    /// The name being edited.
    pub name: String,
}

/// Layout regions for mouse hit testing.
/// Stores the screen coordinates of each UI panel.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegions {
    /// The transport bar at the top.
    pub transport: Rect,
    /// The preset list on the left side.
    pub presets: Rect,
    /// The rows of the preset list, inside its border.
    pub preset_list: Rect,
    /// The click grid panel.
    pub grid: Rect,
    /// The area inside the grid border where the rows are drawn.
    pub grid_cells: Rect,
}

impl LayoutRegions {
    /// Determines which panel contains the given screen coordinates.
    pub fn panel_at(&self, x: u16, y: u16) -> Option<FocusedPanel> {
        if contains(self.grid, x, y) {
            Some(FocusedPanel::Grid)
        } else if contains(self.presets, x, y) {
            Some(FocusedPanel::Presets)
        } else {
            None
        }
    }

    /// Maps screen coordinates to a grid cell (not checked against the
    /// active region).
    pub fn cell_at(&self, x: u16, y: u16) -> Option<Cursor> {
        let cells = self.grid_cells;
        if !contains(cells, x, y) || x < cells.x + GRID_LABEL_WIDTH {
            return None;
        }
        let measure = (y - cells.y) as usize;
        let beat = ((x - cells.x - GRID_LABEL_WIDTH) / CELL_WIDTH) as usize;
        Some(Cursor::new(measure, beat))
    }

    /// Maps screen coordinates to a row of the preset list.
    pub fn preset_row_at(&self, x: u16, y: u16) -> Option<usize> {
        contains(self.preset_list, x, y).then(|| (y - self.preset_list.y) as usize)
    }
}

/// First visible row of a list of `rows` rows that keeps `selected` in view.
pub fn preset_list_offset(selected: usize, rows: usize) -> usize {
    selected.saturating_sub(rows.saturating_sub(1))
}

fn contains(rect: Rect, x: u16, y: u16) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Main application state.
pub struct App<E: ToneEngine = AudioEngine> {
    /// The metronome driving the tone engine.
    pub metronome: Metronome<E>,
    /// Writes recorded sessions to disk.
    recorder: Recorder,
    /// Built-in and user presets.
    pub presets: PresetLibrary,
    /// Highlighted entry in the preset list.
    pub selected_preset: usize,
    /// Currently focused UI panel.
    pub focused_panel: FocusedPanel,
    /// Edit cursor in the click grid.
    pub cursor: Cursor,
    /// Status message to display.
    pub status_message: Option<(String, Instant)>,
    /// Whether the help overlay is visible.
    pub show_help: bool,
    /// Help overlay scroll offset.
    pub help_scroll: u16,
    /// Save-preset dialog state.
    pub preset_dialog: PresetDialogState,
    /// Layout regions for mouse hit testing (updated each frame).
    pub layout: LayoutRegions,
    /// The most recently written recording.
    pub last_recording: Option<PathBuf>,
}

impl App<AudioEngine> {
    /// Creates an application playing through the default audio device.
    ///
    /// The device is opened on the first start, not here.
    ///
    /// # Arguments
    ///
    /// * `presets` - Preset library, usually loaded from the presets file
    /// * `record_dir` - Directory recordings are written to
    pub fn new(presets: PresetLibrary, record_dir: impl Into<PathBuf>) -> Self {
        let engine = AudioEngine::new();
        let tap = engine.capture_tap();
        Self::with_engine(engine, tap, presets, record_dir)
    }
}

impl<E: ToneEngine> App<E> {
    /// Creates an application around any tone engine.
    ///
    /// # Arguments
    ///
    /// * `engine` - Tone engine for the metronome
    /// * `tap` - Tap receiving the engine's output, used for recording
    /// * `presets` - Preset library
    /// * `record_dir` - Directory recordings are written to
    pub fn with_engine(
        engine: E,
        tap: CaptureTap,
        presets: PresetLibrary,
        record_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            metronome: Metronome::new(engine),
            recorder: Recorder::new(tap, record_dir),
            presets,
            selected_preset: 0,
            focused_panel: FocusedPanel::default(),
            cursor: Cursor::ORIGIN,
            status_message: None,
            show_help: false,
            help_scroll: 0,
            preset_dialog: PresetDialogState::default(),
            layout: LayoutRegions::default(),
            last_recording: None,
        }
    }

    /// Returns true while a capture is running.
    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Directory new recordings are written to.
    pub fn record_dir(&self) -> &Path {
        self.recorder.output_dir()
    }

    /// Updates the layout regions used for hit testing.
    pub fn update_layout(&mut self, layout: LayoutRegions) {
        self.layout = layout;
    }

    /// Sets a status message to display temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    /// How long the event loop may wait for input before the next update.
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        match self.metronome.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(FRAME_INTERVAL),
            None => FRAME_INTERVAL,
        }
    }

    // ==================== Transport ====================

    /// Drives the metronome timers and reacts to what happened.
    /// Should be called on every pass through the event loop.
    pub fn update(&mut self, now: Instant) {
        self.metronome.tick(now);
        for event in self.metronome.drain_events() {
            self.handle_playback_event(event);
        }
    }

    fn handle_playback_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::SessionStarted(SessionMode::Record) => {
                match self.recorder.start() {
                    Ok(()) => self.set_status("Recording"),
                    Err(e) => {
                        tracing::error!("Failed to start recording: {}", e);
                        self.set_status(format!("Recording failed: {}", e));
                    }
                }
            }
            PlaybackEvent::SessionStarted(SessionMode::Play) => {
                self.finish_recording();
                self.set_status("Playing");
            }
            PlaybackEvent::Stopped => self.finish_recording(),
            PlaybackEvent::Position(_) | PlaybackEvent::Countdown(_) => {}
        }
    }

    /// Stops the recorder and reports where the audio went.
    fn finish_recording(&mut self) {
        match self.recorder.stop() {
            Ok(Some(path)) => {
                self.set_status(format!("Saved recording to {}", path.display()));
                self.last_recording = Some(path);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Failed to save recording: {}", e);
                self.set_status(format!("Recording failed: {}", e));
            }
        }
    }

    fn start_session(&mut self, mode: SessionMode, now: Instant) {
        match self.metronome.start(mode, now) {
            Ok(()) => {
                if self.metronome.status().countdown > 0 {
                    self.set_status("Counting in...");
                }
                for event in self.metronome.drain_events() {
                    self.handle_playback_event(event);
                }
            }
            Err(e) => self.set_status(format!("Audio unavailable: {}", e)),
        }
    }

    /// Starts playback, or stops whatever is running.
    pub fn toggle_playback(&mut self, now: Instant) {
        if self.metronome.is_active() {
            self.stop_playback();
        } else {
            self.start_session(SessionMode::Play, now);
        }
    }

    /// Starts a recorded session, or stops whatever is running.
    pub fn toggle_recording(&mut self, now: Instant) {
        if self.metronome.is_active() {
            self.stop_playback();
        } else {
            self.start_session(SessionMode::Record, now);
        }
    }

    /// Stops the countdown, playback and any recording.
    pub fn stop_playback(&mut self) {
        let was_recording = self.is_recording();
        self.metronome.stop();
        for event in self.metronome.drain_events() {
            self.handle_playback_event(event);
        }
        // Keep the recording's own message visible
        if !was_recording {
            self.set_status("Stopped");
        }
    }

    /// Applies an edit to the metronome and handles any resulting stop.
    ///
    /// # Returns
    ///
    /// The edit's result, and whether the edit stopped playback
    fn edit<R>(&mut self, f: impl FnOnce(&mut Metronome<E>) -> R) -> (R, bool) {
        let was_active = self.metronome.is_active();
        let result = f(&mut self.metronome);
        for event in self.metronome.drain_events() {
            self.handle_playback_event(event);
        }
        (result, was_active && !self.metronome.is_active())
    }

    fn report_edit(&mut self, message: String, stopped: bool) {
        if stopped {
            self.set_status(format!("{} (playback stopped)", message));
        } else {
            self.set_status(message);
        }
    }

    // ==================== Settings ====================

    /// Changes the tempo by `delta` beats per minute.
    pub fn adjust_bpm(&mut self, delta: i64) {
        let (bpm, stopped) = self.edit(|m| m.set_bpm(m.bpm() as i64 + delta));
        self.report_edit(format!("Tempo: {} bpm", bpm), stopped);
    }

    /// Changes the volume by `delta`. Never interrupts playback.
    pub fn adjust_volume(&mut self, delta: f32) {
        let volume = self.metronome.set_volume(self.metronome.volume() + delta);
        self.set_status(format!("Volume: {:.0}%", volume * 100.0));
    }

    /// Toggles the lead-in countdown for the next start.
    pub fn toggle_countdown(&mut self) {
        let enabled = !self.metronome.countdown_enabled();
        self.metronome.set_countdown_enabled(enabled);
        self.set_status(if enabled {
            "Countdown on"
        } else {
            "Countdown off"
        });
    }

    /// Adds or removes measures.
    pub fn adjust_measures(&mut self, delta: i32) {
        let (measures, stopped) = self.edit(|m| {
            let current = m.pattern().num_measures() as i64;
            m.set_num_measures((current + delta as i64).max(0) as usize)
        });
        self.clamp_cursor();
        self.report_edit(format!("Measures: {}", measures), stopped);
    }

    /// Adds or removes beats in the measure under the cursor.
    pub fn adjust_beats(&mut self, delta: i32) {
        let measure = self.cursor.measure;
        let (beats, stopped) = self.edit(|m| {
            let current = m.pattern().beats_in(measure) as i64;
            m.set_beats_per_measure(measure, (current + delta as i64).max(0) as usize)
        });
        self.clamp_cursor();
        self.report_edit(format!("Measure {}: {} beats", measure + 1, beats), stopped);
    }

    // ==================== Grid editing ====================

    /// Moves the grid cursor by whole measures, keeping it in the active region.
    pub fn move_cursor_measure(&mut self, delta: i32) {
        let measure = self.cursor.measure as i64 + delta as i64;
        self.cursor.measure = measure.max(0) as usize;
        self.clamp_cursor();
    }

    /// Moves the grid cursor by beats within its measure.
    pub fn move_cursor_beat(&mut self, delta: i32) {
        let beat = self.cursor.beat as i64 + delta as i64;
        self.cursor.beat = beat.max(0) as usize;
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        let pattern = self.metronome.pattern();
        let measure = self.cursor.measure.min(pattern.num_measures() - 1);
        let beat = self.cursor.beat.min(pattern.beats_in(measure) - 1);
        self.cursor = Cursor::new(measure, beat);
    }

    /// Cycles the cell under the cursor through Off → Normal → Accent.
    pub fn cycle_cell_at_cursor(&mut self) {
        let Cursor { measure, beat } = self.cursor;
        let (_, stopped) = self.edit(|m| m.cycle_cell(measure, beat));
        if stopped {
            self.set_status("Playback stopped: pattern changed");
        }
    }

    /// Sets the cell under the cursor.
    pub fn set_cell_at_cursor(&mut self, state: ClickState) {
        let Cursor { measure, beat } = self.cursor;
        let (_, stopped) = self.edit(|m| m.set_cell(measure, beat, state));
        if stopped {
            self.set_status("Playback stopped: pattern changed");
        }
    }

    /// Handles a mouse click at the given screen coordinates.
    pub fn handle_mouse_click(&mut self, x: u16, y: u16) {
        if let Some(panel) = self.layout.panel_at(x, y) {
            self.focused_panel = panel;
        }
        if let Some(cell) = self.layout.cell_at(x, y) {
            if self.metronome.pattern().is_active(cell.measure, cell.beat) {
                self.cursor = cell;
                self.cycle_cell_at_cursor();
            }
        } else if let Some(row) = self.layout.preset_row_at(x, y) {
            let rows = self.layout.preset_list.height as usize;
            let index = row + preset_list_offset(self.selected_preset, rows);
            if index < self.presets.len() {
                self.selected_preset = index;
            }
        }
    }

    // ==================== Presets ====================

    /// Moves the preset selection up.
    pub fn preset_up(&mut self) {
        self.selected_preset = self.selected_preset.saturating_sub(1);
    }

    /// Moves the preset selection down.
    pub fn preset_down(&mut self) {
        if self.selected_preset + 1 < self.presets.len() {
            self.selected_preset += 1;
        }
    }

    /// Loads the highlighted preset into the grid.
    pub fn load_selected_preset(&mut self) {
        let Some(preset) = self.presets.get(self.selected_preset) else {
            return;
        };
        let name = preset.name.clone();
        let pattern = preset.to_pattern();
        let (_, stopped) = self.edit(|m| m.load_pattern(pattern));
        self.clamp_cursor();
        tracing::info!("Loaded preset '{}'", name);
        self.report_edit(format!("Loaded preset: {}", name), stopped);
    }

    /// Loads a preset by name, ignoring case.
    ///
    /// # Returns
    ///
    /// true if a preset with that name exists
    pub fn load_preset_named(&mut self, name: &str) -> bool {
        let Some(index) = self
            .presets
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
        else {
            return false;
        };
        self.selected_preset = index;
        self.load_selected_preset();
        true
    }

    /// Deletes the highlighted preset if it is user-defined.
    pub fn delete_selected_preset(&mut self) {
        match self.presets.remove_user(self.selected_preset) {
            Ok(removed) => {
                self.selected_preset = self.selected_preset.min(self.presets.len() - 1);
                self.set_status(format!("Deleted preset: {}", removed.name));
            }
            Err(e) => {
                tracing::warn!("Cannot delete preset: {}", e);
                self.set_status(format!("Cannot delete: {}", e));
            }
        }
    }

    /// Opens the save-preset dialog.
    pub fn open_preset_dialog(&mut self) {
        self.preset_dialog = PresetDialogState {
            open: true,
            name: String::new(),
        };
    }

    /// Adds a character to the preset name.
    pub fn preset_dialog_input(&mut self, c: char) {
        if self.preset_dialog.name.chars().count() < MAX_PRESET_NAME {
            self.preset_dialog.name.push(c);
        }
    }

    /// Removes the last character of the preset name.
    pub fn preset_dialog_backspace(&mut self) {
        self.preset_dialog.name.pop();
    }

    /// Saves the current pattern under the entered name.
    ///
    /// # Returns
    ///
    /// true if the dialog was closed
    pub fn preset_dialog_confirm(&mut self) -> bool {
        let name = self.preset_dialog.name.clone();
        match self.presets.add_user(&name, self.metronome.pattern()) {
            Ok(index) => {
                self.selected_preset = index;
                self.preset_dialog.open = false;
                self.set_status(format!("Saved preset: {}", name.trim()));
                true
            }
            Err(crate::metronome::PresetError::EmptyName) => {
                self.set_status("Enter a preset name");
                false
            }
            Err(e) => {
                // The preset is kept for this session even if the file failed
                tracing::error!("Failed to save presets: {}", e);
                self.selected_preset = self.presets.len() - 1;
                self.preset_dialog.open = false;
                self.set_status(format!("Preset not written: {}", e));
                true
            }
        }
    }

    /// Closes the save-preset dialog without saving.
    pub fn preset_dialog_cancel(&mut self) {
        self.preset_dialog.open = false;
    }
}
