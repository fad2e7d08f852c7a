//! Bottom status bar: transient messages or key hints, plus the coverage bar.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::app::App;
use crate::tui::theme::current_theme;

/// Width of the loaded-range bar, in cells.
const COVERAGE_WIDTH: u16 = 30;

const HINTS: &[(&str, &str)] = &[
    ("j/k", "move"),
    ("PgUp/PgDn", "page"),
    ("g/G", "ends"),
    ("/", "search"),
    ("t", "jump to date"),
    ("J/K", "scroll text"),
    ("q", "quit"),
];

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = current_theme();

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(COVERAGE_WIDTH + 2)])
        .split(area);

    let content = if let Some((msg, _)) = &app.status_message {
        Line::from(Span::styled(format!(" {msg}"), theme.status_bar))
    } else {
        let mut spans = Vec::new();
        for (key, desc) in HINTS {
            spans.push(Span::styled(format!(" {key}"), theme.prompt));
            spans.push(Span::styled(format!(":{desc}"), theme.status_bar));
        }
        Line::from(spans)
    };
    frame.render_widget(Paragraph::new(content).style(theme.status_bar), chunks[0]);

    let total = app.session.total().unwrap_or(0);
    let cells = app
        .session
        .ranges()
        .coverage(COVERAGE_WIDTH as usize, total);
    let mut spans = vec![Span::styled(" ", theme.status_bar)];
    for loaded in cells {
        if loaded {
            spans.push(Span::styled("█", theme.coverage_loaded));
        } else {
            spans.push(Span::styled("░", theme.coverage_missing));
        }
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(theme.status_bar),
        chunks[1],
    );
}
