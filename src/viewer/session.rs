//! Client browsing session: fetched messages, fetch state and the filter.
//!
//! [`ViewSession`] is the state machine behind a scrolling client. It does
//! no I/O: it emits [`FetchRequest`]s, absorbs [`FetchResponse`]s and tells
//! the caller when to render. Fetched messages live in one arena `Vec` whose
//! first element has absolute index `base_offset`.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::ViewerConfig;
use crate::model::page::{MessagePage, MessageView};

use super::debounce::Debouncer;
use super::filter::FilteredView;
use super::ranges::LoadedRanges;
use super::window::{Surface, VirtualRenderer, VisibleWindow};

/// Session tuning, usually taken from [`ViewerConfig`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub chunk_size: usize,
    pub load_threshold: f64,
    pub scroll_debounce: Duration,
    pub search_debounce: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ViewerConfig::default())
    }
}

impl From<&ViewerConfig> for SessionOptions {
    fn from(cfg: &ViewerConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size.max(1),
            load_threshold: cfg.load_threshold.clamp(0.0, 1.0),
            scroll_debounce: Duration::from_millis(cfg.scroll_debounce_ms),
            search_debounce: Duration::from_millis(cfg.search_debounce_ms),
        }
    }
}

/// A fetch the caller should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    /// Next page in index order.
    Page {
        generation: u64,
        offset: usize,
        limit: usize,
    },
    /// Page starting at the message nearest to `timestamp`.
    Jump {
        generation: u64,
        timestamp: String,
        limit: usize,
    },
}

impl FetchRequest {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Page { generation, .. } | Self::Jump { generation, .. } => *generation,
        }
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, Self::Jump { .. })
    }
}

/// The result of a [`FetchRequest`].
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub generation: u64,
    pub jump: bool,
    pub result: Result<MessagePage, String>,
}

/// What [`ViewSession::apply_response`] did with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Messages were merged; `added` new records.
    Merged { added: usize },
    /// A jump replaced the loaded messages.
    Replaced { len: usize },
    /// The response belonged to an earlier generation and was dropped.
    Stale,
    /// The page did not continue the loaded range and was dropped.
    Gap,
    /// The fetch failed.
    Failed(String),
}

/// Scroll position of the surface, in surface units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub scroll_top: u64,
    pub client_height: u64,
    pub scroll_height: u64,
}

/// Timers that elapsed during a [`ViewSession::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// The debounced query was applied and the filtered view changed.
    pub filter_changed: bool,
    /// Scrolling has been quiet long enough to evaluate the fetch trigger.
    pub scroll_end: bool,
}

pub struct ViewSession {
    options: SessionOptions,
    messages: Vec<MessageView>,
    base_offset: usize,
    next_offset: usize,
    total: Option<usize>,
    end_reached: bool,
    loading: bool,
    generation: u64,
    ranges: LoadedRanges,
    query: String,
    pending_query: Option<String>,
    filtered: FilteredView,
    query_debounce: Debouncer,
    scroll_debounce: Debouncer,
    last_scroll_height: Option<u64>,
}

impl ViewSession {
    pub fn new(options: SessionOptions) -> Self {
        let query_debounce = Debouncer::new(options.search_debounce);
        let scroll_debounce = Debouncer::new(options.scroll_debounce);
        Self {
            options,
            messages: Vec::new(),
            base_offset: 0,
            next_offset: 0,
            total: None,
            end_reached: false,
            loading: false,
            generation: 0,
            ranges: LoadedRanges::new(),
            query: String::new(),
            pending_query: None,
            filtered: FilteredView::default(),
            query_debounce,
            scroll_debounce,
            last_scroll_height: None,
        }
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Fetched messages in index order.
    pub fn messages(&self) -> &[MessageView] {
        &self.messages
    }

    /// Absolute index of `messages()[0]`.
    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    /// Absolute index the next page fetch starts at.
    pub fn next_offset(&self) -> usize {
        self.next_offset
    }

    /// Total messages on the server, once known.
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_end_reached(&self) -> bool {
        self.end_reached
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ranges(&self) -> &LoadedRanges {
        &self.ranges
    }

    pub fn filtered(&self) -> &FilteredView {
        &self.filtered
    }

    /// The query the filtered view currently reflects.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The query as typed, including keystrokes not yet applied.
    pub fn typed_query(&self) -> &str {
        self.pending_query.as_deref().unwrap_or(&self.query)
    }

    /// The `pos`-th message of the filtered view with its absolute index.
    pub fn view_item(&self, pos: usize) -> Option<(usize, &MessageView)> {
        let i = self.filtered.resolve(pos)?;
        self.messages.get(i).map(|m| (self.base_offset + i, m))
    }

    // ── Fetching ────────────────────────────────────────────────

    /// Request the next page unless one is in flight or the end was reached.
    pub fn request_next_chunk(&mut self) -> Option<FetchRequest> {
        if self.loading || self.end_reached {
            return None;
        }
        self.loading = true;
        Some(FetchRequest::Page {
            generation: self.generation,
            offset: self.next_offset,
            limit: self.options.chunk_size,
        })
    }

    /// Request a jump to `timestamp`. Supersedes any fetch in flight.
    pub fn request_jump(&mut self, timestamp: impl Into<String>) -> FetchRequest {
        self.generation += 1;
        self.loading = true;
        FetchRequest::Jump {
            generation: self.generation,
            timestamp: timestamp.into(),
            limit: self.options.chunk_size,
        }
    }

    /// Merge a fetch result.
    ///
    /// Responses from earlier generations are discarded. Page records are
    /// placed by absolute offset so overlapping records are appended at most
    /// once.
    pub fn apply_response(&mut self, response: FetchResponse) -> ApplyOutcome {
        if response.generation != self.generation {
            debug!(
                got = response.generation,
                current = self.generation,
                "Discarding stale response"
            );
            return ApplyOutcome::Stale;
        }
        self.loading = false;

        let page = match response.result {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Fetch failed");
                return ApplyOutcome::Failed(e);
            }
        };
        self.total = Some(page.total_messages);

        let outcome = if response.jump {
            self.replace_with(page)
        } else {
            self.merge_page(page)
        };
        self.refilter();
        outcome
    }

    fn replace_with(&mut self, page: MessagePage) -> ApplyOutcome {
        let end = page.end();
        self.base_offset = page.offset;
        self.next_offset = end;
        self.end_reached = !page.has_more;
        self.messages = page.messages;
        self.ranges.clear();
        self.ranges.add_segment(self.base_offset, end);
        self.last_scroll_height = None;
        ApplyOutcome::Replaced {
            len: self.messages.len(),
        }
    }

    fn merge_page(&mut self, page: MessagePage) -> ApplyOutcome {
        let end = page.end();
        if self.messages.is_empty() && self.next_offset == self.base_offset {
            self.base_offset = page.offset;
            self.next_offset = page.offset;
        }
        if page.offset > self.next_offset {
            warn!(
                offset = page.offset,
                expected = self.next_offset,
                "Page does not continue loaded range"
            );
            return ApplyOutcome::Gap;
        }

        let skip = self.next_offset - page.offset;
        let added = page.messages.len().saturating_sub(skip);
        self.messages.extend(page.messages.into_iter().skip(skip));
        self.next_offset = self.next_offset.max(end);
        self.ranges.add_segment(page.offset, end);
        self.end_reached = !page.has_more;
        debug!(
            offset = page.offset,
            added,
            loaded = self.messages.len(),
            "Merged page"
        );
        ApplyOutcome::Merged { added }
    }

    // ── Input ───────────────────────────────────────────────────

    /// Record a keystroke in the search box. The filter is recomputed after
    /// the search debounce elapses (see [`tick`](Self::tick)).
    pub fn set_query(&mut self, query: impl Into<String>, now: Instant) {
        self.pending_query = Some(query.into());
        self.query_debounce.poke(now);
    }

    /// Apply a query immediately, bypassing the debounce.
    pub fn apply_query(&mut self, query: impl Into<String>) -> bool {
        self.pending_query = None;
        self.query_debounce.cancel();
        let query = query.into();
        if query == self.query {
            return false;
        }
        self.query = query;
        self.refilter();
        true
    }

    /// Record a scroll event.
    pub fn on_scroll(&mut self, now: Instant) {
        self.scroll_debounce.poke(now);
    }

    /// Advance the debounce timers.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.query_debounce.fire(now) {
            if let Some(query) = self.pending_query.take() {
                outcome.filter_changed = self.apply_query(query);
            }
        }
        outcome.scroll_end = self.scroll_debounce.fire(now);
        outcome
    }

    /// Earliest time a pending timer will fire.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        match (self.query_debounce.remaining(now), self.scroll_debounce.remaining(now)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fetch trigger, evaluated on scroll-end after rendering.
    ///
    /// Fires when idle, not at the end, scrolled past the load threshold and
    /// the surface extent is the one measured after the last render.
    pub fn evaluate_scroll_end(&mut self, metrics: ScrollMetrics) -> Option<FetchRequest> {
        if self.loading || self.end_reached {
            return None;
        }
        let reached = (metrics.scroll_top + metrics.client_height) as f64
            >= metrics.scroll_height as f64 * self.options.load_threshold;
        let settled = self.last_scroll_height == Some(metrics.scroll_height);
        if reached && settled {
            self.request_next_chunk()
        } else {
            None
        }
    }

    /// Remember the surface extent measured after a render.
    pub fn note_rendered(&mut self, scroll_height: u64) {
        self.last_scroll_height = Some(scroll_height);
    }

    /// Render the filtered view and record the resulting extent.
    pub fn render<S: Surface<MessageView>>(
        &mut self,
        renderer: &VirtualRenderer,
        surface: &mut S,
    ) -> VisibleWindow {
        let window = renderer.render(surface, &self.messages, &self.filtered);
        self.note_rendered(surface.scroll_height());
        window
    }

    fn refilter(&mut self) {
        self.filtered = FilteredView::compute(&self.messages, &self.query);
    }
}

impl Default for ViewSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn view(i: usize) -> MessageView {
        MessageView {
            timestamp: NaiveDate::from_ymd_opt(2021, 5, 8)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            sender: (if i % 2 == 0 { "Marc" } else { "Noemí" }).to_string(),
            content: format!("missatge {i}"),
            is_system_message: false,
            attachments: Vec::new(),
        }
    }

    fn page(offset: usize, len: usize, total: usize) -> MessagePage {
        MessagePage {
            messages: (offset..offset + len).map(view).collect(),
            offset,
            limit: len,
            total_messages: total,
            has_more: offset + len < total,
        }
    }

    fn ok(req: &FetchRequest, page: MessagePage) -> FetchResponse {
        FetchResponse {
            generation: req.generation(),
            jump: req.is_jump(),
            result: Ok(page),
        }
    }

    #[test]
    fn test_loading_guard() {
        let mut s = ViewSession::default();
        let req = s.request_next_chunk().unwrap();
        assert!(s.request_next_chunk().is_none());
        s.apply_response(ok(&req, page(0, 50, 120)));
        assert!(s.request_next_chunk().is_some());
    }

    #[test]
    fn test_pages_append_in_order_until_end() {
        let mut s = ViewSession::default();
        for _ in 0..3 {
            let req = s.request_next_chunk().unwrap();
            let FetchRequest::Page { offset, .. } = req else {
                panic!("expected page request");
            };
            let len = 50.min(120 - offset);
            s.apply_response(ok(&req, page(offset, len, 120)));
        }
        assert_eq!(s.messages().len(), 120);
        assert!(s.is_end_reached());
        assert!(s.request_next_chunk().is_none());
        assert_eq!(s.ranges().segments().len(), 1);
    }

    #[test]
    fn test_overlapping_page_appended_once() {
        let mut s = ViewSession::default();
        let req = s.request_next_chunk().unwrap();
        s.apply_response(ok(&req, page(0, 50, 200)));
        let req = s.request_next_chunk().unwrap();
        let outcome = s.apply_response(ok(&req, page(40, 50, 200)));
        assert_eq!(outcome, ApplyOutcome::Merged { added: 40 });
        assert_eq!(s.messages().len(), 90);
        assert_eq!(s.next_offset(), 90);
        assert_eq!(s.messages()[89].content, "missatge 89");
    }

    #[test]
    fn test_stale_response_discarded_after_jump() {
        let mut s = ViewSession::default();
        let page_req = s.request_next_chunk().unwrap();
        let jump_req = s.request_jump("2021-05-08T00:00:00");
        assert_eq!(s.apply_response(ok(&page_req, page(0, 50, 1000))), ApplyOutcome::Stale);
        assert!(s.is_loading());

        let outcome = s.apply_response(ok(&jump_req, page(500, 50, 1000)));
        assert_eq!(outcome, ApplyOutcome::Replaced { len: 50 });
        assert_eq!(s.base_offset(), 500);
        assert_eq!(s.next_offset(), 550);
        assert_eq!(s.view_item(0).unwrap().0, 500);
    }

    #[test]
    fn test_scroll_end_trigger_requires_settled_height() {
        let mut s = ViewSession::default();
        let req = s.request_next_chunk().unwrap();
        s.apply_response(ok(&req, page(0, 50, 500)));

        let metrics = ScrollMetrics {
            scroll_top: 4200,
            client_height: 800,
            scroll_height: 5000,
        };
        // No render recorded yet.
        assert!(s.evaluate_scroll_end(metrics).is_none());
        s.note_rendered(5000);
        assert!(s.evaluate_scroll_end(metrics).is_some());
    }

    #[test]
    fn test_scroll_end_below_threshold() {
        let mut s = ViewSession::default();
        s.note_rendered(5000);
        let metrics = ScrollMetrics {
            scroll_top: 1000,
            client_height: 800,
            scroll_height: 5000,
        };
        assert!(s.evaluate_scroll_end(metrics).is_none());
    }

    #[test]
    fn test_query_is_debounced() {
        let t0 = Instant::now();
        let mut s = ViewSession::default();
        let req = s.request_next_chunk().unwrap();
        s.apply_response(ok(&req, page(0, 10, 10)));

        s.set_query("missatge 3", t0);
        assert_eq!(s.filtered().len(), 10);
        assert!(!s.tick(t0 + Duration::from_millis(100)).filter_changed);
        assert!(s.tick(t0 + Duration::from_millis(300)).filter_changed);
        assert_eq!(s.filtered().len(), 1);
        assert_eq!(s.view_item(0).unwrap().0, 3);
    }

    #[test]
    fn test_failed_fetch_clears_loading() {
        let mut s = ViewSession::default();
        let req = s.request_next_chunk().unwrap();
        let outcome = s.apply_response(FetchResponse {
            generation: req.generation(),
            jump: false,
            result: Err("connection refused".into()),
        });
        assert!(matches!(outcome, ApplyOutcome::Failed(_)));
        assert!(!s.is_loading());
        assert_eq!(s.next_offset(), 0);
    }
}
