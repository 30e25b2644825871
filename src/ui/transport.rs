//! Transport bar rendering.
//!
//! Displays the playback state, position, tempo, volume, countdown setting
//! and the status line.

use crate::app::App;
use crate::audio::ToneEngine;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Builds a "Label: value" pair of spans.
fn field(label: &'static str, value: String) -> Vec<Span<'static>> {
    vec![
        Span::styled(label, Style::default().fg(Color::DarkGray)),
        Span::styled(
            value,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ]
}

/// Renders the transport bar at the top of the screen.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
pub fn render_transport<E: ToneEngine>(frame: &mut Frame, area: Rect, app: &App<E>) {
    let block = Block::default()
        .title(" clicktui ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(14), // Playback state
            Constraint::Length(14), // Position
            Constraint::Length(15), // Tempo
            Constraint::Length(12), // Volume
            Constraint::Length(16), // Countdown
            Constraint::Min(10),    // Pattern size
        ])
        .split(rows[0]);

    let metronome = &app.metronome;
    let status = metronome.status();

    // Playback state
    let play_status = if app.is_recording() {
        Span::styled(
            " [*] REC ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else if status.is_playing {
        Span::styled(
            " [>] PLAY ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else if status.countdown > 0 {
        Span::styled(
            " [~] COUNT ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            " [.] STOP ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(play_status)), chunks[0]);

    // Position display (measure.beat, 1-based)
    let position = match status.position() {
        Some(cursor) => format!("{}.{}", cursor.measure + 1, cursor.beat + 1),
        None => "-.-".to_string(),
    };
    frame.render_widget(
        Paragraph::new(Line::from(field("Pos: ", position))),
        chunks[1],
    );

    frame.render_widget(
        Paragraph::new(Line::from(field(
            "Tempo: ",
            format!("{} bpm", metronome.bpm()),
        ))),
        chunks[2],
    );

    frame.render_widget(
        Paragraph::new(Line::from(field(
            "Vol: ",
            format!("{:.0}%", metronome.volume() * 100.0),
        ))),
        chunks[3],
    );

    let countdown = if metronome.countdown_enabled() {
        "on"
    } else {
        "off"
    };
    frame.render_widget(
        Paragraph::new(Line::from(field("Count-in: ", countdown.to_string()))),
        chunks[4],
    );

    let pattern = metronome.pattern();
    frame.render_widget(
        Paragraph::new(Line::from(field(
            "Beats: ",
            format!("{} in {} bars", pattern.cycle_length(), pattern.num_measures()),
        ))),
        chunks[5],
    );

    // Status message, or the last recording
    let status_line = if let Some((msg, _)) = &app.status_message {
        Line::from(Span::styled(
            msg.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ))
    } else if let Some(path) = &app.last_recording {
        Line::from(vec![
            Span::styled("Last take: ", Style::default().fg(Color::DarkGray)),
            Span::styled(path.display().to_string(), Style::default().fg(Color::White)),
        ])
    } else {
        Line::from(vec![
            Span::styled("Press ? for help  ", Style::default().fg(Color::DarkGray)),
            Span::styled("Recording to: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                app.record_dir().display().to_string(),
                Style::default().fg(Color::White),
            ),
        ])
    };
    frame.render_widget(Paragraph::new(status_line), rows[1]);
}
