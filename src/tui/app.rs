//! Application state for the terminal browser.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::ViewerConfig;
use crate::model::chunk::TimeRange;
use crate::model::page::MessageView;
use crate::service::ChatService;
use crate::viewer::debounce::RenderThrottle;
use crate::viewer::{
    ApplyOutcome, FetchRequest, FetchWorker, SessionOptions, ViewSession, VirtualRenderer,
    WindowGeometry,
};

use super::surface::TermSurface;

/// How long a status message stays visible.
const STATUS_TTL: Duration = Duration::from_secs(4);

/// What keystrokes are currently feeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a search query (kept in the session).
    Search,
    /// Typing a date to jump to.
    Jump(String),
}

pub struct App {
    pub source_name: String,
    pub session: ViewSession,
    pub surface: TermSurface,
    pub time_range: Option<TimeRange>,
    /// Position of the selected message in the filtered view.
    pub selected: usize,
    pub detail_scroll: u16,
    pub input: InputMode,
    pub status_message: Option<(String, Instant)>,
    pub should_quit: bool,
    renderer: VirtualRenderer,
    throttle: RenderThrottle,
    worker: FetchWorker,
}

impl App {
    pub fn new(service: Arc<ChatService>, config: &ViewerConfig, source_name: String) -> Self {
        let time_range = service.time_range().ok().flatten();
        // One terminal row per message.
        let renderer = VirtualRenderer::new(WindowGeometry {
            item_height: 1,
            ..WindowGeometry::from(config)
        });
        let mut app = Self {
            source_name,
            session: ViewSession::new(SessionOptions::from(config)),
            surface: TermSurface::new(),
            time_range,
            selected: 0,
            detail_scroll: 0,
            input: InputMode::Normal,
            status_message: None,
            should_quit: false,
            renderer,
            throttle: RenderThrottle::new(Duration::from_millis(config.render_throttle_ms)),
            worker: FetchWorker::spawn(service),
        };
        if let Some(request) = app.session.request_next_chunk() {
            app.submit(request);
        }
        app.throttle.request();
        app
    }

    /// The selected message with its absolute index.
    pub fn selected_message(&self) -> Option<(usize, &MessageView)> {
        self.session.view_item(self.selected)
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Called by the list widget with the rows it has available.
    pub fn set_viewport(&mut self, rows: u16) {
        if self.surface.set_viewport_height(u64::from(rows)) {
            self.throttle.request();
        }
    }

    /// Move the selection by `delta` rows, scrolling to keep it visible.
    pub fn move_selection(&mut self, delta: isize, now: Instant) {
        let len = self.session.filtered().len();
        if len == 0 {
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(len - 1);
        self.detail_scroll = 0;
        self.follow_selection(now);
    }

    pub fn select_first(&mut self, now: Instant) {
        self.selected = 0;
        self.detail_scroll = 0;
        self.follow_selection(now);
    }

    pub fn select_last(&mut self, now: Instant) {
        self.selected = self.session.filtered().len().saturating_sub(1);
        self.detail_scroll = 0;
        self.follow_selection(now);
    }

    pub fn page_size(&self) -> isize {
        self.surface.metrics().client_height.max(1) as isize
    }

    /// Start a jump to `timestamp`; any page fetch in flight becomes stale.
    pub fn jump_to(&mut self, timestamp: String, now: Instant) {
        let request = self.session.request_jump(timestamp);
        self.submit(request);
        self.selected = 0;
        self.surface.scroll_to(0);
        self.session.on_scroll(now);
    }

    /// Apply `query` without waiting for the search debounce.
    pub fn apply_query_now(&mut self, query: impl Into<String>) {
        let anchor = self.selection_anchor();
        if self.session.apply_query(query) {
            self.on_filter_changed(anchor);
        }
    }

    /// List index of the selected message, used to find it again after the
    /// filtered view changes.
    fn selection_anchor(&self) -> Option<usize> {
        self.session.filtered().resolve(self.selected)
    }

    /// Keep the selected message selected if it is still visible, otherwise
    /// go back to the top.
    fn on_filter_changed(&mut self, anchor: Option<usize>) {
        self.detail_scroll = 0;
        match anchor.and_then(|i| self.session.filtered().position_of(i)) {
            Some(pos) => {
                self.selected = pos;
                self.scroll_to_selection();
            }
            None => {
                self.selected = 0;
                self.surface.scroll_to(0);
            }
        }
        self.throttle.request();
    }

    /// Periodic work: absorb fetch results, run timers, render and evaluate
    /// the fetch trigger, in that order.
    pub fn tick(&mut self, now: Instant) {
        while let Some(response) = self.worker.try_recv() {
            match self.session.apply_response(response) {
                ApplyOutcome::Merged { .. } | ApplyOutcome::Replaced { .. } => {
                    self.throttle.request();
                }
                ApplyOutcome::Failed(e) => self.set_status(format!("Fetch failed: {e}")),
                ApplyOutcome::Stale | ApplyOutcome::Gap => {}
            }
        }

        let anchor = self.selection_anchor();
        let timers = self.session.tick(now);
        if timers.filter_changed {
            self.on_filter_changed(anchor);
        }

        if self.throttle.should_render(now) {
            let window = self.session.render(&self.renderer, &mut self.surface);
            debug!(start = window.start, end = window.end, "Rendered window");
        }

        if timers.scroll_end {
            if let Some(request) = self.session.evaluate_scroll_end(self.surface.metrics()) {
                self.submit(request);
            }
        }

        if let Some((_, when)) = &self.status_message {
            if when.elapsed() >= STATUS_TTL {
                self.status_message = None;
            }
        }
    }

    /// How long the event loop may sleep before the next timer is due.
    pub fn poll_timeout(&self, now: Instant, max: Duration) -> Duration {
        let mut timeout = max;
        if let Some(d) = self.session.next_deadline(now) {
            timeout = timeout.min(d);
        }
        if self.throttle.is_pending() {
            timeout = timeout.min(Duration::from_millis(20));
        }
        timeout
    }

    /// Scroll so the selection is visible and arm the fetch trigger. Only
    /// user movement arms it; merged pages never do.
    fn follow_selection(&mut self, now: Instant) {
        self.scroll_to_selection();
        self.session.on_scroll(now);
    }

    fn scroll_to_selection(&mut self) {
        let metrics = self.surface.metrics();
        let sel = self.selected as u64;
        let rows = metrics.client_height.max(1);
        let top = if sel < metrics.scroll_top {
            sel
        } else if sel >= metrics.scroll_top + rows {
            sel + 1 - rows
        } else {
            metrics.scroll_top
        };
        if top != metrics.scroll_top {
            // Not clamped: the content extent is stale until the next render.
            self.surface.scroll_to(top);
            self.throttle.request();
        }
    }

    fn submit(&mut self, request: FetchRequest) {
        if !self.worker.submit(request) {
            self.set_status("Fetch worker stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::Message;
    use crate::service::ServiceSettings;
    use crate::store::RecordStore;
    use chrono::{Duration as ChronoDuration, NaiveDate};

    /// `n` messages, one per minute; every 500th says "hit".
    fn sparse_service(n: usize) -> Arc<ChatService> {
        let base = NaiveDate::from_ymd_opt(2021, 5, 8)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let messages = (0..n)
            .map(|i| Message {
                timestamp: base + ChronoDuration::minutes(i as i64),
                sender: "Marc".to_string(),
                content: if i % 500 == 0 {
                    format!("hit {i}")
                } else {
                    format!("msg {i}")
                },
                attachments: Vec::new(),
                is_system_message: false,
            })
            .collect();
        Arc::new(ChatService::from_store(
            RecordStore::new(messages),
            None,
            ServiceSettings::default(),
        ))
    }

    /// Drive the event loop without input. Virtual time advances 50ms per
    /// tick; the short sleep lets the fetch worker answer.
    fn idle(app: &mut App, now: &mut Instant, ticks: usize) {
        for _ in 0..ticks {
            *now += Duration::from_millis(50);
            std::thread::sleep(Duration::from_millis(2));
            app.tick(*now);
        }
    }

    fn app_with(n: usize) -> (App, Instant) {
        let mut app = App::new(
            sparse_service(n),
            &ViewerConfig::default(),
            "chat".to_string(),
        );
        app.set_viewport(40);
        let mut now = Instant::now();
        idle(&mut app, &mut now, 100);
        assert_eq!(app.session.messages().len(), 50);
        (app, now)
    }

    #[test]
    fn test_idle_app_does_not_keep_fetching() {
        let (mut app, mut now) = app_with(5000);
        app.apply_query_now("hit");
        assert_eq!(app.session.filtered().len(), 1);

        // One keypress near the end of a short filtered list: one page.
        app.move_selection(1, now);
        idle(&mut app, &mut now, 2000);
        assert_eq!(app.session.messages().len(), 100);

        app.move_selection(1, now);
        idle(&mut app, &mut now, 200);
        assert_eq!(app.session.messages().len(), 150);
    }

    #[test]
    fn test_filter_keeps_selected_message() {
        let (mut app, _) = app_with(200);
        app.selected = 12;
        // "msg 1" matches 1 and 10..=19 among the first fifty.
        app.apply_query_now("msg 1");
        assert_eq!(app.selected, 3);
        let (abs, selected) = app.selected_message().unwrap();
        assert_eq!(abs, 12);
        assert_eq!(selected.content, "msg 12");

        // Filtered out: back to the top.
        app.apply_query_now("hit");
        assert_eq!(app.selected, 0);
        assert_eq!(app.selected_message().unwrap().0, 0);
    }
}
