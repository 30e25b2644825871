//! Click grid rendering.
//!
//! One row per measure and one cell per beat slot. Cells outside the active
//! region are drawn dimmed so hidden edits stay visible. The cell under the
//! playback cursor is highlighted while playing.

use crate::app::{App, CELL_WIDTH, GRID_LABEL_WIDTH};
use crate::audio::ToneEngine;
use crate::metronome::{ClickState, Cursor, MAX_BEATS, MAX_MEASURES};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Text of one cell, [`CELL_WIDTH`] columns wide.
#[inline]
fn cell_text(state: ClickState) -> &'static str {
    match state {
        ClickState::Off => "[ ] ",
        ClickState::Normal => "[o] ",
        ClickState::Accent => "[O] ",
    }
}

/// Base style for a cell's state.
#[inline]
fn cell_style(state: ClickState, active: bool) -> Style {
    if !active {
        return Style::default().fg(Color::DarkGray);
    }
    match state {
        ClickState::Off => Style::default().fg(Color::Gray),
        ClickState::Normal => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        ClickState::Accent => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    }
}

/// Renders the beat number ruler above the grid.
fn render_ruler(frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::raw(" ".repeat(GRID_LABEL_WIDTH as usize))];
    for beat in 0..MAX_BEATS {
        spans.push(Span::styled(
            format!(" {:<width$}", beat + 1, width = CELL_WIDTH as usize - 1),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Renders the click grid.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
/// * `focused` - Whether this panel is focused
pub fn render_grid<E: ToneEngine>(frame: &mut Frame, area: Rect, app: &App<E>, focused: bool) {
    let pattern = app.metronome.pattern();
    let status = app.metronome.status();
    let playhead = status.position().filter(|_| status.is_playing);

    let block = Block::default()
        .title(format!(
            " Pattern ({} bars, {} bpm) ",
            pattern.num_measures(),
            app.metronome.bpm()
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::Gray }));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    render_ruler(
        frame,
        Rect {
            height: 1,
            ..inner
        },
    );

    let rows = (inner.height - 1).min(MAX_MEASURES as u16);
    for row in 0..rows {
        let measure = row as usize;
        let measure_active = measure < pattern.num_measures();

        let label_style = if measure_active {
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let mut spans = vec![Span::styled(format!(" M{:<3}", measure + 1), label_style)];

        for beat in 0..MAX_BEATS {
            let state = pattern.cell(measure, beat);
            let here = Cursor::new(measure, beat);
            let mut style = cell_style(state, pattern.is_active(measure, beat));

            if playhead == Some(here) {
                style = style.bg(Color::Green).fg(Color::Black);
            } else if focused && app.cursor == here {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(cell_text(state), style));
        }

        let line_area = Rect {
            y: inner.y + 1 + row,
            height: 1,
            ..inner
        };
        frame.render_widget(Paragraph::new(Line::from(spans)), line_area);
    }
}
