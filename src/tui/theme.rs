//! Color theme for the terminal browser.

use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub header_bar: Style,
    pub status_bar: Style,
    pub list_selected: Style,
    pub list_normal: Style,
    pub list_system: Style,
    pub timestamp: Style,
    pub sender: Style,
    pub message_body: Style,
    pub attachment: Style,
    pub attachment_missing: Style,
    pub border: Style,
    pub prompt: Style,
    pub dim: Style,
    pub coverage_loaded: Style,
    pub coverage_missing: Style,
}

impl Theme {
    /// Dark theme (default).
    pub fn dark() -> Self {
        Self {
            header_bar: Style::default()
                .fg(Color::Rgb(200, 200, 220))
                .bg(Color::Rgb(30, 30, 46)),
            status_bar: Style::default()
                .fg(Color::Rgb(150, 150, 170))
                .bg(Color::Rgb(30, 30, 46)),
            list_selected: Style::default()
                .fg(Color::White)
                .bg(Color::Rgb(60, 60, 100)),
            list_normal: Style::default().fg(Color::Rgb(200, 200, 220)),
            list_system: Style::default()
                .fg(Color::Rgb(120, 120, 140))
                .add_modifier(Modifier::ITALIC),
            timestamp: Style::default().fg(Color::Rgb(130, 130, 150)),
            sender: Style::default()
                .fg(Color::Rgb(130, 170, 255))
                .add_modifier(Modifier::BOLD),
            message_body: Style::default().fg(Color::Rgb(220, 220, 230)),
            attachment: Style::default().fg(Color::Green),
            attachment_missing: Style::default().fg(Color::Rgb(200, 90, 90)),
            border: Style::default().fg(Color::Rgb(80, 80, 100)),
            prompt: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            dim: Style::default().fg(Color::Rgb(110, 110, 130)),
            coverage_loaded: Style::default().fg(Color::Cyan),
            coverage_missing: Style::default().fg(Color::Rgb(60, 60, 80)),
        }
    }
}

/// Return the active theme.
pub fn current_theme() -> Theme {
    Theme::dark()
}
