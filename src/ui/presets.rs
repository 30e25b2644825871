//! Preset list rendering.
//!
//! Lists the built-in presets followed by the user's own, with the
//! highlighted entry loaded by Enter. User presets are marked with `*`.

use crate::app::{preset_list_offset, App};
use crate::audio::ToneEngine;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

/// Height reserved for the control hints at the bottom.
pub(super) const CONTROLS_HEIGHT: u16 = 2;

/// Renders the preset list panel on the left side.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
/// * `focused` - Whether this panel is focused
pub fn render_presets<E: ToneEngine>(frame: &mut Frame, area: Rect, app: &App<E>, focused: bool) {
    let block = Block::default()
        .title(" Presets ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::Gray }));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Split the inner area into preset list and controls
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),                  // Preset list
            Constraint::Length(CONTROLS_HEIGHT), // Control hints
        ])
        .split(inner);

    let max_name_len = inner.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = app
        .presets
        .iter()
        .enumerate()
        .map(|(i, preset)| {
            let marker = if preset.is_user_defined {
                Span::styled("*", Style::default().fg(Color::Magenta))
            } else {
                Span::raw(" ")
            };

            let name = if preset.name.chars().count() > max_name_len {
                let cut: String = preset
                    .name
                    .chars()
                    .take(max_name_len.saturating_sub(3))
                    .collect();
                format!("{}...", cut)
            } else {
                preset.name.clone()
            };

            let name_style = if i == app.selected_preset {
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };

            ListItem::new(Line::from(vec![marker, Span::styled(name, name_style)]))
        })
        .collect();

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(40, 40, 40))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let offset = preset_list_offset(app.selected_preset, chunks[0].height as usize);
    let mut state = ListState::default()
        .with_offset(offset)
        .with_selected(Some(app.selected_preset));

    frame.render_stateful_widget(list, chunks[0], &mut state);

    // Render control hints
    let key_style = Style::default().fg(Color::Yellow);
    let desc_style = Style::default().fg(Color::DarkGray);

    let line1 = Line::from(vec![
        Span::styled("[", desc_style),
        Span::styled("Enter", key_style),
        Span::styled("]Load ", desc_style),
        Span::styled("[", desc_style),
        Span::styled("s", key_style),
        Span::styled("]Save", desc_style),
    ]);

    let line2 = Line::from(vec![
        Span::styled("[", desc_style),
        Span::styled("d", key_style),
        Span::styled("]Delete user preset", desc_style),
    ]);

    frame.render_widget(Paragraph::new(vec![line1, line2]), chunks[1]);
}
