//! Terminal user interface components.
//!
//! This module provides the visual components for the metronome,
//! including the transport bar, preset list, click grid and overlays.

mod countdown;
mod dialogs;
mod grid;
mod help;
mod presets;
mod transport;

use crate::app::{App, FocusedPanel, LayoutRegions};
use crate::audio::ToneEngine;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::Frame;

pub use countdown::render_countdown;
pub use dialogs::render_preset_dialog;
pub use grid::render_grid;
pub use help::render_help;
pub use presets::render_presets;
pub use transport::render_transport;

/// Width of the preset list panel.
const PRESETS_WIDTH: u16 = 28;

/// Calculates the layout regions for the given terminal size.
///
/// This is called during rendering to update the layout regions used
/// for mouse hit testing.
fn calculate_layout(size: Rect) -> LayoutRegions {
    // Main vertical layout: transport, content
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Transport
            Constraint::Min(10),   // Content area
        ])
        .split(size);

    // Content area: presets on left, grid on right
    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(PRESETS_WIDTH), // Presets
            Constraint::Min(40),               // Grid
        ])
        .split(main_chunks[1]);

    let grid = content_chunks[1];
    let presets = content_chunks[0];

    LayoutRegions {
        transport: main_chunks[0],
        presets,
        preset_list: Rect {
            x: presets.x + 1,
            y: presets.y + 1,
            width: presets.width.saturating_sub(2),
            height: presets.height.saturating_sub(2 + presets::CONTROLS_HEIGHT),
        },
        grid,
        grid_cells: Rect {
            x: grid.x + 1,
            // One row for the beat ruler
            y: grid.y + 2,
            width: grid.width.saturating_sub(2),
            height: grid.height.saturating_sub(3),
        },
    }
}

/// Renders the complete UI layout and updates layout regions.
///
/// The layout is divided into:
/// - Top: Transport bar with tempo, volume and playback status
/// - Left: Preset list
/// - Center: Click grid
///
/// Overlays (countdown, preset dialog, help) are drawn on top.
pub fn render<E: ToneEngine>(frame: &mut Frame, app: &mut App<E>) {
    let layout = calculate_layout(frame.area());
    app.update_layout(layout.clone());

    render_transport(frame, layout.transport, app);
    render_presets(
        frame,
        layout.presets,
        app,
        app.focused_panel == FocusedPanel::Presets,
    );
    render_grid(
        frame,
        layout.grid,
        app,
        app.focused_panel == FocusedPanel::Grid,
    );

    render_countdown(frame, layout.grid, app.metronome.status().countdown);
    render_preset_dialog(frame, app);
    if app.show_help {
        render_help(frame, app.help_scroll);
    }
}

/// Helper function to center a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::manual::ManualEngine;
    use crate::audio::CaptureTap;
    use crate::metronome::{PresetLibrary, SessionMode};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::time::Instant;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn test_app() -> App<ManualEngine> {
        App::with_engine(
            ManualEngine::new(),
            CaptureTap::new(),
            PresetLibrary::in_memory(),
            std::env::temp_dir(),
        )
    }

    #[test]
    fn test_render_idle_screen() {
        let mut app = test_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("STOP"));
        assert!(text.contains("60 bpm"));
        assert!(text.contains("Bossa Nova"));
        assert!(text.contains("M1"));
        assert_eq!(app.layout.grid_cells.y, app.layout.grid.y + 2);
    }

    #[test]
    fn test_render_shows_record_dir() {
        let mut app = App::with_engine(
            ManualEngine::new(),
            CaptureTap::new(),
            PresetLibrary::in_memory(),
            "takes",
        );
        assert_eq!(app.record_dir(), std::path::Path::new("takes"));

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Recording to: takes"));
    }

    #[test]
    fn test_render_countdown_overlay() {
        let mut app = test_app();
        app.metronome
            .start(SessionMode::Play, Instant::now())
            .unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|frame| render(frame, &mut app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("COUNT-IN"));
        assert!(text.contains('4'));
    }

    #[test]
    fn test_layout_hit_testing() {
        let layout = calculate_layout(Rect::new(0, 0, 100, 20));
        let cells = layout.grid_cells;
        assert_eq!(
            layout.panel_at(cells.x + 10, cells.y),
            Some(FocusedPanel::Grid)
        );
        assert_eq!(
            layout.panel_at(layout.presets.x + 2, layout.presets.y + 2),
            Some(FocusedPanel::Presets)
        );
        assert_eq!(layout.panel_at(0, 0), None);
    }
}
