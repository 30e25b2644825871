//! clicktui - A terminal click-pattern metronome.
//!
//! Plays a grid of accented, normal and silent clicks at a steady tempo,
//! with an optional four-beat count-in and recording of the output.
//!
//! # Features
//!
//! - Up to 8 measures of up to 16 beats each, edited in a click grid
//! - Lookahead scheduling on the audio device clock
//! - Count-in before playback starts
//! - Recording of the metronome output to WAV
//! - Built-in and user-defined presets (JSON)
//! - Headless WAV export
//!
//! # Usage
//!
//! ```bash
//! cargo run                                   # Start the TUI
//! cargo run -- --bpm 120 --preset "Waltz"     # Start with a preset
//! cargo run -- --export click.wav --loops 8   # Render without a terminal
//! ```
//!
//! Press `?` for help with keyboard shortcuts.

use clicktui::app::{App, FocusedPanel, BPM_COARSE_STEP, VOLUME_STEP};
use clicktui::audio::export_to_wav;
use clicktui::metronome::{ClickState, Pattern, PresetLibrary};
use clicktui::ui;

use anyhow::{bail, Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::time::Instant;

/// Default location of the user presets file.
const DEFAULT_PRESETS_PATH: &str = ".clicktui-presets.json";

/// Default number of passes through the pattern for `--export`.
const DEFAULT_EXPORT_LOOPS: u32 = 4;

/// Command-line options for the application.
struct CliOptions {
    /// Starting tempo.
    bpm: Option<i64>,
    /// Starting volume (0.0 to 1.0).
    volume: Option<f32>,
    /// Start with the count-in disabled.
    no_countdown: bool,
    /// Preset to load on startup.
    preset: Option<String>,
    /// Path of the user presets file.
    presets_path: PathBuf,
    /// Directory recordings are written to.
    record_dir: PathBuf,
    /// Render to this WAV file instead of starting the TUI.
    export: Option<PathBuf>,
    /// Passes through the pattern when exporting.
    loops: u32,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--bpm <n>`: Starting tempo (clamped to 30-300)
    /// - `--volume <v>`: Starting volume from 0.0 to 1.0
    /// - `--no-countdown`: Disable the count-in
    /// - `--preset <name>`: Load a preset by name
    /// - `--presets <path>`: User presets file
    /// - `--record-dir <dir>`: Where recordings are written
    /// - `--export <path>` and `--loops <n>`: Render a WAV file and exit
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = Self {
            bpm: None,
            volume: None,
            no_countdown: false,
            preset: None,
            presets_path: PathBuf::from(DEFAULT_PRESETS_PATH),
            record_dir: PathBuf::from("."),
            export: None,
            loops: DEFAULT_EXPORT_LOOPS,
        };
        let mut i = 1;

        while i < args.len() {
            let flag = args[i].as_str();
            let mut value = || next_value(&args, &mut i, flag);

            match flag {
                "--bpm" => {
                    let v = value()?;
                    options.bpm = Some(v.parse().with_context(|| format!("Invalid tempo: {}", v))?);
                }
                "--volume" => {
                    let v = value()?;
                    options.volume =
                        Some(v.parse().with_context(|| format!("Invalid volume: {}", v))?);
                }
                "--no-countdown" => options.no_countdown = true,
                "--preset" => options.preset = Some(value()?.to_string()),
                "--presets" => options.presets_path = PathBuf::from(value()?),
                "--record-dir" => options.record_dir = PathBuf::from(value()?),
                "--export" => options.export = Some(PathBuf::from(value()?)),
                "--loops" => {
                    let v = value()?;
                    options.loops = v
                        .parse()
                        .with_context(|| format!("Invalid loop count: {}", v))?;
                }
                "--help" | "-h" => {
                    print_usage(args.first().map(String::as_str).unwrap_or("clicktui"));
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown option: {}", other);
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        Ok(options)
    }
}

/// Consumes the value following the flag at `args[*i]`.
fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(v) => Ok(v.as_str()),
        None => bail!("{} requires a value", flag),
    }
}

fn print_usage(program: &str) {
    eprintln!("clicktui - Terminal click-pattern metronome");
    eprintln!();
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --bpm N             Starting tempo (30-300, default 60)");
    eprintln!("  --volume V          Starting volume from 0.0 to 1.0 (default 0.75)");
    eprintln!("  --no-countdown      Start without the 4-beat count-in");
    eprintln!("  --preset NAME       Load a preset by name");
    eprintln!("  --presets PATH      User presets file (default {})", DEFAULT_PRESETS_PATH);
    eprintln!("  --record-dir DIR    Directory for recordings (default .)");
    eprintln!("  --export PATH       Render the pattern to a WAV file and exit");
    eprintln!("  --loops N           Passes through the pattern when exporting (default {})", DEFAULT_EXPORT_LOOPS);
    eprintln!("  -h, --help          Print this help message");
}

/// Main entry point.
fn main() -> Result<()> {
    // Parse CLI options first (before any terminal setup)
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let presets = PresetLibrary::load(&cli.presets_path).with_context(|| {
        format!("Failed to load presets from {}", cli.presets_path.display())
    })?;

    if let Some(output) = &cli.export {
        return export_headless(&cli, &presets, output);
    }

    let mut app = App::new(presets, cli.record_dir.clone());
    if let Some(name) = &cli.preset {
        if !app.load_preset_named(name) {
            bail!("Unknown preset: {}", name);
        }
    }
    if let Some(bpm) = cli.bpm {
        app.metronome.set_bpm(bpm);
    }
    if let Some(volume) = cli.volume {
        app.metronome.set_volume(volume);
    }
    app.metronome.set_countdown_enabled(!cli.no_countdown);

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;

    let result = run_app(&mut terminal, &mut app);

    app.stop_playback();
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    result
}

/// Renders the selected pattern to a WAV file without starting the TUI.
fn export_headless(cli: &CliOptions, presets: &PresetLibrary, output: &PathBuf) -> Result<()> {
    let pattern = match &cli.preset {
        Some(name) => match presets.find(name) {
            Some(preset) => preset.to_pattern(),
            None => bail!("Unknown preset: {}", name),
        },
        None => Pattern::new(),
    };
    let bpm = cli.bpm.unwrap_or(clicktui::metronome::DEFAULT_BPM as i64);
    let volume = cli.volume.unwrap_or(clicktui::metronome::DEFAULT_VOLUME);

    let mut last_percent = None;
    let frames = export_to_wav(
        &pattern,
        bpm,
        volume,
        cli.loops,
        output,
        Some(|progress: f32| {
            let percent = (progress * 100.0) as u32;
            if last_percent != Some(percent) {
                last_percent = Some(percent);
                eprint!("\rExporting... {:3}%", percent);
                let _ = io::stderr().flush();
            }
        }),
    )
    .with_context(|| format!("Failed to export {}", output.display()))?;
    eprintln!();

    eprintln!(
        "Exported {:.2}s to {}",
        frames as f64 / clicktui::audio::SAMPLE_RATE as f64,
        output.display()
    );
    Ok(())
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Drive the countdown and scheduler timers
        app.update(Instant::now());
        app.clear_expired_status();

        terminal.draw(|frame| ui::render(frame, app))?;

        // Wake up in time for the next scheduler deadline
        if !event::poll(app.poll_timeout(Instant::now()))? {
            continue;
        }

        match event::read()? {
            Event::Key(key) => {
                // Only handle key press events (not release)
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                if app.show_help {
                    handle_help_key(app, key.code);
                    continue;
                }

                if app.preset_dialog.open {
                    match key.code {
                        KeyCode::Enter => {
                            app.preset_dialog_confirm();
                        }
                        KeyCode::Esc => app.preset_dialog_cancel(),
                        KeyCode::Backspace => app.preset_dialog_backspace(),
                        KeyCode::Char(c) => {
                            // Only accept printable characters
                            if !c.is_control() {
                                app.preset_dialog_input(c);
                            }
                        }
                        _ => {}
                    }
                    continue;
                }

                if handle_key(app, key.code, key.modifiers) {
                    break;
                }
            }
            Event::Mouse(mouse) => handle_mouse(app, mouse),
            _ => {}
        }
    }

    Ok(())
}

/// Handles keys while the help overlay is visible.
fn handle_help_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => {
            app.show_help = false;
            app.help_scroll = 0; // Reset scroll on close
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.help_scroll = app.help_scroll.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.help_scroll = app.help_scroll.saturating_add(1);
        }
        KeyCode::PageUp => {
            app.help_scroll = app.help_scroll.saturating_sub(10);
        }
        KeyCode::PageDown => {
            app.help_scroll = app.help_scroll.saturating_add(10);
        }
        KeyCode::Home => {
            app.help_scroll = 0;
        }
        _ => {}
    }
}

/// Handles mouse events.
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.show_help {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                app.show_help = false;
                app.help_scroll = 0;
            }
            MouseEventKind::ScrollUp => {
                app.help_scroll = app.help_scroll.saturating_sub(3);
            }
            MouseEventKind::ScrollDown => {
                app.help_scroll = app.help_scroll.saturating_add(3);
            }
            _ => {}
        }
        return;
    }

    if app.preset_dialog.open {
        return;
    }

    if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
        app.handle_mouse_click(mouse.column, mouse.row);
    }
}

/// Handles a key press event.
///
/// # Returns
///
/// `true` if the application should quit
fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> bool {
    let now = Instant::now();

    // Global key bindings (work in any panel)
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => {
            app.show_help = true;
            return false;
        }
        KeyCode::Tab => {
            app.focused_panel = match app.focused_panel {
                FocusedPanel::Grid => FocusedPanel::Presets,
                FocusedPanel::Presets => FocusedPanel::Grid,
            };
            return false;
        }
        KeyCode::Char(' ') => {
            app.toggle_playback(now);
            return false;
        }
        KeyCode::Char('r') => {
            app.toggle_recording(now);
            return false;
        }
        KeyCode::Char('c') => {
            app.toggle_countdown();
            return false;
        }
        KeyCode::Char('s') => {
            app.open_preset_dialog();
            return false;
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.adjust_bpm(1);
            return false;
        }
        KeyCode::Char('-') => {
            app.adjust_bpm(-1);
            return false;
        }
        KeyCode::Char(']') => {
            app.adjust_bpm(BPM_COARSE_STEP);
            return false;
        }
        KeyCode::Char('[') => {
            app.adjust_bpm(-BPM_COARSE_STEP);
            return false;
        }
        KeyCode::Char('.') => {
            app.adjust_volume(VOLUME_STEP);
            return false;
        }
        KeyCode::Char(',') => {
            app.adjust_volume(-VOLUME_STEP);
            return false;
        }
        _ => {}
    }

    match app.focused_panel {
        FocusedPanel::Grid => handle_grid_key(app, code),
        FocusedPanel::Presets => handle_presets_key(app, code),
    }
    false
}

/// Handles keys when the click grid is focused.
fn handle_grid_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Left | KeyCode::Char('h') => app.move_cursor_beat(-1),
        KeyCode::Right | KeyCode::Char('l') => app.move_cursor_beat(1),
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor_measure(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor_measure(1),
        KeyCode::Enter | KeyCode::Char('x') => app.cycle_cell_at_cursor(),
        KeyCode::Char('a') => app.set_cell_at_cursor(ClickState::Accent),
        KeyCode::Char('n') => app.set_cell_at_cursor(ClickState::Normal),
        KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('0') => {
            app.set_cell_at_cursor(ClickState::Off)
        }
        KeyCode::Char('m') => app.adjust_measures(1),
        KeyCode::Char('M') => app.adjust_measures(-1),
        KeyCode::Char('b') => app.adjust_beats(1),
        KeyCode::Char('B') => app.adjust_beats(-1),
        _ => {}
    }
}

/// Handles keys when the preset list is focused.
fn handle_presets_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => app.preset_up(),
        KeyCode::Down | KeyCode::Char('j') => app.preset_down(),
        KeyCode::Enter => app.load_selected_preset(),
        KeyCode::Delete | KeyCode::Char('d') => app.delete_selected_preset(),
        _ => {}
    }
}
