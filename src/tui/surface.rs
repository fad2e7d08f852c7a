//! Row-based [`Surface`] backing the message list.
//!
//! One message occupies one terminal row. The surface only remembers which
//! view positions were materialised; the list widget looks the messages up in
//! the session when drawing.

use crate::model::page::MessageView;
use crate::viewer::{ScrollMetrics, Surface};

#[derive(Debug, Default)]
pub struct TermSurface {
    scroll_top: u64,
    viewport_height: u64,
    content_height: u64,
    first_item: Option<usize>,
    item_count: usize,
    placeholder: Option<String>,
}

impl TermSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_viewport_height(&mut self, height: u64) -> bool {
        let changed = self.viewport_height != height;
        self.viewport_height = height;
        changed
    }

    /// Whether view position `pos` was materialised by the last render.
    pub fn contains(&self, pos: usize) -> bool {
        self.first_item
            .is_some_and(|first| pos >= first && pos < first + self.item_count)
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: self.scroll_top,
            client_height: self.viewport_height,
            scroll_height: self.content_height,
        }
    }

    /// Move the viewport without re-rendering.
    pub fn scroll_to(&mut self, top: u64) {
        self.scroll_top = top;
    }
}

impl Surface<MessageView> for TermSurface {
    fn scroll_top(&self) -> u64 {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, top: u64) {
        let max = self.content_height.saturating_sub(self.viewport_height);
        self.scroll_top = top.min(max);
    }

    fn viewport_height(&self) -> u64 {
        self.viewport_height
    }

    fn scroll_height(&self) -> u64 {
        self.content_height
    }

    fn clear(&mut self) {
        self.content_height = 0;
        self.first_item = None;
        self.item_count = 0;
        self.placeholder = None;
    }

    fn push_spacer(&mut self, height: u64) {
        self.content_height += height;
    }

    fn push_item(&mut self, pos: usize, _item: &MessageView) {
        self.first_item.get_or_insert(pos);
        self.item_count += 1;
        self.content_height += 1;
    }

    fn push_placeholder(&mut self, text: &str) {
        self.placeholder = Some(text.to_string());
        self.content_height += 1;
    }
}
