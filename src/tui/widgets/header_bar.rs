//! Top header bar showing the export name, load progress and time span.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::tui::app::App;
use crate::tui::theme::current_theme;

/// Render the top header bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = current_theme();
    let session = &app.session;

    let loaded = session.messages().len();
    let total = session
        .total()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());

    let mut spans = vec![
        Span::styled(format!(" {}", app.source_name), theme.header_bar),
        Span::styled(format!(" | {loaded} / {total} loaded"), theme.header_bar),
    ];

    if session.filtered().is_filtered() {
        spans.push(Span::styled(
            format!(
                " | filter: \"{}\" ({} hits)",
                session.query(),
                session.filtered().len()
            ),
            theme.header_bar,
        ));
    }

    if let Some(range) = &app.time_range {
        let right = format!(
            " {} → {} ",
            range.first_timestamp.format("%Y-%m-%d"),
            range.last_timestamp.format("%Y-%m-%d")
        );
        let left_len: usize = spans.iter().map(|s| s.content.width()).sum();
        let width = area.width as usize;
        if width > left_len + right.width() {
            spans.push(Span::styled(
                " ".repeat(width - left_len - right.width()),
                theme.header_bar,
            ));
            spans.push(Span::styled(right, theme.dim));
        }
    }

    let bar = Paragraph::new(Line::from(spans)).style(theme.header_bar);
    frame.render_widget(bar, area);
}
