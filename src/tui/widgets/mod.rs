//! TUI widgets for rendering different UI panels.

pub mod header_bar;
pub mod input_bar;
pub mod message_list;
pub mod message_view;
pub mod status_bar;
