//! Input line for search queries and jump dates.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::app::{App, InputMode};
use crate::tui::theme::current_theme;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = current_theme();

    let (prompt, text, hint) = match &app.input {
        InputMode::Search => (
            " /: ",
            app.session.typed_query().to_string(),
            format!(
                "  ({} / {})",
                app.session.filtered().len(),
                app.session.messages().len()
            ),
        ),
        InputMode::Jump(buffer) => (" jump to: ", buffer.clone(), "  YYYY-MM-DD [HH:MM]".into()),
        InputMode::Normal => return,
    };

    let line = Line::from(vec![
        Span::styled(prompt, theme.prompt),
        Span::styled(text, theme.message_body),
        Span::styled("_", theme.prompt),
        Span::styled(hint, theme.dim),
    ]);
    frame.render_widget(Paragraph::new(line).style(theme.status_bar), area);
}
