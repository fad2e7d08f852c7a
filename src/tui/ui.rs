//! Main render function that dispatches to widgets.

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;

use super::app::{App, InputMode};
use super::widgets;

/// Render the entire TUI frame.
pub fn render(frame: &mut Frame, app: &mut App) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // header bar
            Constraint::Min(5),     // message list
            Constraint::Length(10), // selected message
            Constraint::Length(1),  // status or input bar
        ])
        .split(frame.area());

    widgets::header_bar::render(frame, app, vertical[0]);
    widgets::message_list::render(frame, app, vertical[1]);
    widgets::message_view::render(frame, app, vertical[2]);

    match app.input {
        InputMode::Normal => widgets::status_bar::render(frame, app, vertical[3]),
        InputMode::Search | InputMode::Jump(_) => {
            widgets::input_bar::render(frame, app, vertical[3])
        }
    }
}
