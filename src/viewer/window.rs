//! Virtual scrolling: materialise only the items near the viewport.
//!
//! The full extent of the list is reserved with two spacers so scroll bars and
//! offsets behave as if every item were present.

use crate::config::ViewerConfig;

use super::filter::FilteredView;

/// Text shown when the current view has no items.
pub const EMPTY_PLACEHOLDER: &str = "No messages";

/// Fixed item height and overscan around the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub item_height: u64,
    pub overscan_above: usize,
    pub overscan_below: usize,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self::from(&ViewerConfig::default())
    }
}

impl From<&ViewerConfig> for WindowGeometry {
    fn from(cfg: &ViewerConfig) -> Self {
        Self {
            item_height: u64::from(cfg.item_height.max(1)),
            overscan_above: cfg.overscan_above,
            overscan_below: cfg.overscan_below,
        }
    }
}

/// The slice `[start, end)` of the view to materialise, with spacer sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibleWindow {
    pub start: usize,
    pub end: usize,
    pub top_spacer: u64,
    pub bottom_spacer: u64,
}

impl VisibleWindow {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WindowGeometry {
    /// Window for a view of `n` items scrolled to `scroll_top` in a viewport
    /// `viewport_height` tall.
    pub fn compute(&self, scroll_top: u64, viewport_height: u64, n: usize) -> VisibleWindow {
        let h = self.item_height.max(1);
        let first_visible = usize::try_from(scroll_top / h).unwrap_or(usize::MAX);
        let start = first_visible.saturating_sub(self.overscan_above).min(n);
        let visible = usize::try_from(viewport_height.div_ceil(h)).unwrap_or(usize::MAX);
        let end = start
            .saturating_add(visible)
            .saturating_add(self.overscan_below)
            .min(n);
        VisibleWindow {
            start,
            end,
            top_spacer: start as u64 * h,
            bottom_spacer: (n - end) as u64 * h,
        }
    }
}

/// A scrollable output the renderer can rebuild.
pub trait Surface<T> {
    fn scroll_top(&self) -> u64;
    fn set_scroll_top(&mut self, top: u64);
    fn viewport_height(&self) -> u64;
    /// Total scrollable extent of the current content.
    fn scroll_height(&self) -> u64;
    fn clear(&mut self);
    fn push_spacer(&mut self, height: u64);
    /// `pos` is the item's position in the view.
    fn push_item(&mut self, pos: usize, item: &T);
    fn push_placeholder(&mut self, text: &str);
}

/// Rebuilds a [`Surface`] from the visible window of a filtered list.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualRenderer {
    pub geometry: WindowGeometry,
}

impl VirtualRenderer {
    pub fn new(geometry: WindowGeometry) -> Self {
        Self { geometry }
    }

    /// Replace the surface content with the items of `view` around the
    /// current scroll position, then restore that position.
    pub fn render<T, S: Surface<T>>(
        &self,
        surface: &mut S,
        items: &[T],
        view: &FilteredView,
    ) -> VisibleWindow {
        let saved = surface.scroll_top();
        let n = view.len();
        surface.clear();

        if n == 0 {
            surface.push_placeholder(EMPTY_PLACEHOLDER);
            surface.set_scroll_top(0);
            return VisibleWindow::default();
        }

        let window = self
            .geometry
            .compute(saved, surface.viewport_height(), n);
        surface.push_spacer(window.top_spacer);
        for pos in window.start..window.end {
            if let Some(item) = view.resolve(pos).and_then(|i| items.get(i)) {
                surface.push_item(pos, item);
            }
        }
        surface.push_spacer(window.bottom_spacer);
        surface.set_scroll_top(saved);
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_at_top() {
        let g = WindowGeometry::default();
        let w = g.compute(0, 800, 1000);
        assert_eq!((w.start, w.end), (0, 28));
        assert_eq!(w.top_spacer, 0);
        assert_eq!(w.bottom_spacer, (1000 - 28) * 100);
    }

    #[test]
    fn test_window_scrolled() {
        let g = WindowGeometry::default();
        let w = g.compute(50_000, 800, 1000);
        assert_eq!(w.start, 490);
        assert_eq!(w.end, 518);
        assert_eq!(w.top_spacer + w.bottom_spacer + w.len() as u64 * 100, 100_000);
    }

    #[test]
    fn test_window_size_independent_of_total() {
        let g = WindowGeometry::default();
        let small = g.compute(5_000, 750, 10_000);
        let large = g.compute(5_000, 750, 10_000_000);
        assert_eq!(small.len(), large.len());
        assert!(large.len() <= 8 + 30);
    }

    #[test]
    fn test_window_clamped_past_end() {
        let g = WindowGeometry::default();
        let w = g.compute(1_000_000, 800, 5);
        assert_eq!((w.start, w.end), (5, 5));
        assert_eq!(w.bottom_spacer, 0);
    }
}
