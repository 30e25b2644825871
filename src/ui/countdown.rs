//! Count-in overlay rendering.

use crate::metronome::COUNTDOWN_BEATS;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;

/// Renders the remaining count-in beats over `area`. Draws nothing when
/// `remaining` is 0.
pub fn render_countdown(frame: &mut Frame, area: Rect, remaining: u8) {
    if remaining == 0 {
        return;
    }

    let overlay = centered_rect(40, 50, area);
    frame.render_widget(Clear, overlay);

    let block = Block::default()
        .title(" COUNT-IN ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let elapsed = COUNTDOWN_BEATS.saturating_sub(remaining);
    let dots: Vec<Span> = (0..COUNTDOWN_BEATS)
        .map(|i| {
            if i <= elapsed {
                Span::styled(" * ", Style::default().fg(Color::Yellow))
            } else {
                Span::styled(" . ", Style::default().fg(Color::DarkGray))
            }
        })
        .collect();

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            remaining.to_string(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(dots),
    ];

    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(block),
        overlay,
    );
}
