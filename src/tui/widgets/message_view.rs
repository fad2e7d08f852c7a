//! Detail pane for the selected message.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::app::App;
use crate::tui::theme::current_theme;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = current_theme();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border);

    let Some((index, msg)) = app.selected_message() else {
        frame.render_widget(block, area);
        return;
    };
    let block = block.title(format!(" #{} ", index + 1));

    let mut lines = vec![Line::from(vec![
        Span::styled(msg.sender.clone(), theme.sender),
        Span::styled(
            format!("  {}", msg.timestamp.format("%Y-%m-%d %H:%M:%S")),
            theme.timestamp,
        ),
        Span::styled(
            if msg.is_system_message { "  (system)" } else { "" },
            theme.dim,
        ),
    ])];

    for text in msg.content.lines() {
        lines.push(Line::from(Span::styled(text.to_string(), theme.message_body)));
    }

    for att in &msg.attachments {
        let style = if att.exists {
            theme.attachment
        } else {
            theme.attachment_missing
        };
        lines.push(Line::from(Span::styled(
            format!("  [{:?}] {} ({})", att.kind, att.name, att.size),
            style,
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    frame.render_widget(paragraph, area);
}
