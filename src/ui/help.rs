//! Help overlay rendering.
//!
//! Displays keyboard shortcuts and commands in a modal overlay.

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;

/// Key binding entry for the help display.
struct KeyBinding {
    key: &'static str,
    description: &'static str,
}

const GENERAL_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "?",
        description: "Toggle this help",
    },
    KeyBinding {
        key: "q / Ctrl+C",
        description: "Quit",
    },
    KeyBinding {
        key: "Tab",
        description: "Switch focus between grid and presets",
    },
    KeyBinding {
        key: "Space",
        description: "Start / stop playback",
    },
    KeyBinding {
        key: "r",
        description: "Start / stop recording",
    },
    KeyBinding {
        key: "c",
        description: "Toggle the 4-beat count-in",
    },
    KeyBinding {
        key: "s",
        description: "Save the current pattern as a preset",
    },
];

const TEMPO_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "+ / -",
        description: "Tempo up/down by 1 bpm",
    },
    KeyBinding {
        key: "] / [",
        description: "Tempo up/down by 10 bpm",
    },
    KeyBinding {
        key: ". / ,",
        description: "Volume up/down by 5%",
    },
];

const GRID_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "h / Left",
        description: "Previous beat",
    },
    KeyBinding {
        key: "l / Right",
        description: "Next beat",
    },
    KeyBinding {
        key: "k / Up",
        description: "Previous measure",
    },
    KeyBinding {
        key: "j / Down",
        description: "Next measure",
    },
    KeyBinding {
        key: "Enter / x",
        description: "Cycle cell (off, normal, accent)",
    },
    KeyBinding {
        key: "a",
        description: "Set cell to accent",
    },
    KeyBinding {
        key: "n",
        description: "Set cell to normal",
    },
    KeyBinding {
        key: "Del / 0",
        description: "Set cell to off",
    },
    KeyBinding {
        key: "m / M",
        description: "Add/remove a measure",
    },
    KeyBinding {
        key: "b / B",
        description: "Add/remove a beat per measure",
    },
];

const PRESET_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Up / Down",
        description: "Select preset",
    },
    KeyBinding {
        key: "Enter",
        description: "Load selected preset",
    },
    KeyBinding {
        key: "d / Del",
        description: "Delete selected user preset",
    },
];

const MOUSE_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Click cell",
        description: "Cycle grid cell",
    },
    KeyBinding {
        key: "Click preset",
        description: "Select preset",
    },
    KeyBinding {
        key: "Scroll",
        description: "Scroll this help",
    },
];

/// Renders the help overlay.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `scroll` - Vertical scroll offset
pub fn render_help(frame: &mut Frame, scroll: u16) {
    let area = centered_rect(70, 80, frame.area());

    // Clear the area behind the popup
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Help - Keyboard Shortcuts ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Scrollable content
            Constraint::Length(1), // Fixed footer
        ])
        .split(inner);

    let styles = SectionStyles {
        section: Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        key: Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        desc: Style::default().fg(Color::White),
    };

    let mut lines: Vec<Line<'static>> = Vec::new();
    add_section(&mut lines, "General", GENERAL_BINDINGS, &styles);
    add_section(&mut lines, "Tempo & Volume", TEMPO_BINDINGS, &styles);
    add_section(&mut lines, "Pattern Grid", GRID_BINDINGS, &styles);
    add_section(&mut lines, "Presets Panel", PRESET_BINDINGS, &styles);
    add_section(&mut lines, "Mouse Controls", MOUSE_BINDINGS, &styles);

    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), chunks[0]);

    let footer = Paragraph::new(Line::from(Span::styled(
        "Scroll: Up/Down/j/k/Mouse  |  Close: ?/Esc",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));
    frame.render_widget(footer, chunks[1]);
}

struct SectionStyles {
    section: Style,
    key: Style,
    desc: Style,
}

fn add_section(
    lines: &mut Vec<Line<'static>>,
    title: &'static str,
    bindings: &[KeyBinding],
    styles: &SectionStyles,
) {
    lines.push(Line::from(Span::styled(title, styles.section)));
    for binding in bindings {
        lines.push(Line::from(vec![
            Span::styled(format!("{:15}", binding.key), styles.key),
            Span::styled(binding.description, styles.desc),
        ]));
    }
    lines.push(Line::from(""));
}
