//! Message list: draws the rows the virtual renderer materialised.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::tui::app::App;
use crate::tui::theme::current_theme;

const SENDER_WIDTH: usize = 16;

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let theme = current_theme();

    let title = if app.session.is_loading() {
        " Messages (loading…) "
    } else {
        " Messages "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }
    app.set_viewport(inner.height);

    if let Some(text) = app.surface.placeholder() {
        let p = Paragraph::new(Line::from(Span::styled(format!(" {text}"), theme.dim)));
        frame.render_widget(p, inner);
        return;
    }

    let top = app.surface.metrics().scroll_top as usize;
    let width = inner.width as usize;
    let mut lines: Vec<Line> = Vec::with_capacity(inner.height as usize);

    for pos in top..top + inner.height as usize {
        if !app.surface.contains(pos) {
            lines.push(Line::default());
            continue;
        }
        let Some((_, msg)) = app.session.view_item(pos) else {
            lines.push(Line::default());
            continue;
        };

        let row_style = if pos == app.selected {
            theme.list_selected
        } else if msg.is_system_message {
            theme.list_system
        } else {
            theme.list_normal
        };

        let stamp = format!(" {} ", msg.timestamp.format("%Y-%m-%d %H:%M"));
        let sender = fit(&msg.sender, SENDER_WIDTH);
        let clip = if msg.attachments.is_empty() {
            String::new()
        } else {
            format!(" [+{}]", msg.attachments.len())
        };
        let first_line = msg.content.lines().next().unwrap_or("");
        let used = stamp.width() + SENDER_WIDTH + 2 + clip.width();
        let body = fit(first_line, width.saturating_sub(used));

        let pick = |s: Style| if pos == app.selected { row_style } else { s };
        lines.push(
            Line::from(vec![
                Span::styled(stamp, pick(theme.timestamp)),
                Span::styled(sender, pick(theme.sender)),
                Span::styled(": ", row_style),
                Span::styled(body, row_style),
                Span::styled(clip, pick(theme.attachment)),
            ])
            .style(row_style),
        );
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Pad or truncate `s` to exactly `width` display columns.
fn fit(s: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push_str(&" ".repeat(width - used));
    out
}
