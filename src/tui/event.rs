//! Keyboard handling.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::parser::timestamp::parse_query_timestamp;

use super::app::{App, InputMode};

/// Process a key event and update the application state.
pub fn handle_key_event(app: &mut App, key: KeyEvent, now: Instant) {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.input.clone() {
        InputMode::Search => handle_search_input(app, key, now),
        InputMode::Jump(buffer) => handle_jump_input(app, key, buffer, now),
        InputMode::Normal => handle_normal_keys(app, key, now),
    }
}

fn handle_normal_keys(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1, now),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1, now),
        KeyCode::PageDown | KeyCode::Char(' ') => app.move_selection(app.page_size(), now),
        KeyCode::PageUp => app.move_selection(-app.page_size(), now),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(now),
        KeyCode::Char('G') | KeyCode::End => app.select_last(now),
        KeyCode::Char('J') => app.detail_scroll = app.detail_scroll.saturating_add(1),
        KeyCode::Char('K') => app.detail_scroll = app.detail_scroll.saturating_sub(1),
        KeyCode::Char('/') => app.input = InputMode::Search,
        KeyCode::Char('t') => app.input = InputMode::Jump(String::new()),
        KeyCode::Esc if !app.session.query().is_empty() => app.apply_query_now(""),
        _ => {}
    }
}

/// Keystrokes edit the session's pending query; the filter follows after the
/// search debounce, or immediately on Enter.
fn handle_search_input(app: &mut App, key: KeyEvent, now: Instant) {
    let mut query = app.session.typed_query().to_string();
    match key.code {
        KeyCode::Enter => {
            app.input = InputMode::Normal;
            app.apply_query_now(query);
        }
        KeyCode::Esc => {
            app.input = InputMode::Normal;
            app.apply_query_now("");
        }
        KeyCode::Backspace => {
            query.pop();
            app.session.set_query(query, now);
        }
        KeyCode::Char(c) => {
            query.push(c);
            app.session.set_query(query, now);
        }
        _ => {}
    }
}

fn handle_jump_input(app: &mut App, key: KeyEvent, mut buffer: String, now: Instant) {
    match key.code {
        KeyCode::Enter => {
            app.input = InputMode::Normal;
            if parse_query_timestamp(&buffer).is_some() {
                app.jump_to(buffer, now);
            } else {
                app.set_status(format!(
                    "Cannot read '{buffer}' as a date (use YYYY-MM-DD or YYYY-MM-DD HH:MM)"
                ));
            }
        }
        KeyCode::Esc => app.input = InputMode::Normal,
        KeyCode::Backspace => {
            buffer.pop();
            app.input = InputMode::Jump(buffer);
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            app.input = InputMode::Jump(buffer);
        }
        _ => {}
    }
}
