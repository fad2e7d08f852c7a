//! End-to-end tests of the client pipeline against an in-process service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, NaiveDate};

use chatscroll::model::message::Message;
use chatscroll::model::page::MessageView;
use chatscroll::service::{ChatService, ServiceSettings};
use chatscroll::store::RecordStore;
use chatscroll::viewer::session::TickOutcome;
use chatscroll::viewer::source::{execute, ChunkSource, FetchWorker};
use chatscroll::viewer::window::{Surface, VirtualRenderer, WindowGeometry};
use chatscroll::viewer::{ApplyOutcome, FetchRequest, ScrollMetrics, SessionOptions, ViewSession};

/// One message per minute from 2021-05-08 09:00, alternating senders.
fn service(n: usize) -> Arc<ChatService> {
    let base = NaiveDate::from_ymd_opt(2021, 5, 8)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let messages = (0..n)
        .map(|i| Message {
            timestamp: base + ChronoDuration::minutes(i as i64),
            sender: (if i % 2 == 0 { "Marc" } else { "Noemí" }).to_string(),
            content: format!("missatge {i}"),
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

fn options(chunk_size: usize) -> SessionOptions {
    SessionOptions {
        chunk_size,
        load_threshold: 0.8,
        scroll_debounce: Duration::from_millis(300),
        search_debounce: Duration::from_millis(300),
    }
}

/// Surface that records what the renderer pushed.
#[derive(Default)]
struct RecordingSurface {
    scroll_top: u64,
    viewport: u64,
    height: u64,
    items: Vec<usize>,
    placeholder: Option<String>,
}

impl Surface<MessageView> for RecordingSurface {
    fn scroll_top(&self) -> u64 {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, top: u64) {
        self.scroll_top = top.min(self.height.saturating_sub(self.viewport));
    }

    fn viewport_height(&self) -> u64 {
        self.viewport
    }

    fn scroll_height(&self) -> u64 {
        self.height
    }

    fn clear(&mut self) {
        self.height = 0;
        self.items.clear();
        self.placeholder = None;
    }

    fn push_spacer(&mut self, height: u64) {
        self.height += height;
    }

    fn push_item(&mut self, pos: usize, _item: &MessageView) {
        self.items.push(pos);
        self.height += 100;
    }

    fn push_placeholder(&mut self, text: &str) {
        self.placeholder = Some(text.to_string());
    }
}

fn fetch(source: &dyn ChunkSource, session: &mut ViewSession, req: &FetchRequest) -> ApplyOutcome {
    session.apply_response(execute(source, req))
}

#[test]
fn test_progressive_loading_to_end() {
    let svc = service(120);
    let mut session = ViewSession::new(options(50));

    let mut outcomes = Vec::new();
    while let Some(req) = session.request_next_chunk() {
        outcomes.push(fetch(svc.as_ref(), &mut session, &req));
    }

    assert_eq!(
        outcomes,
        vec![
            ApplyOutcome::Merged { added: 50 },
            ApplyOutcome::Merged { added: 50 },
            ApplyOutcome::Merged { added: 20 },
        ]
    );
    assert!(session.is_end_reached());
    assert_eq!(session.total(), Some(120));
    assert_eq!(session.ranges().loaded_count(), 120);
    assert_eq!(session.messages()[119].content, "missatge 119");
}

#[test]
fn test_scroll_trigger_after_render() {
    let svc = service(500);
    let mut session = ViewSession::new(options(50));
    let renderer = VirtualRenderer::new(WindowGeometry::default());
    let mut surface = RecordingSurface {
        viewport: 800,
        ..Default::default()
    };

    let req = session.request_next_chunk().unwrap();
    fetch(svc.as_ref(), &mut session, &req);
    let window = session.render(&renderer, &mut surface);
    assert_eq!(surface.height, 50 * 100);
    assert_eq!(window.start, 0);
    // Visible 8 plus 20 below; nothing above at the top.
    assert_eq!(window.end, 28);

    // Near the top: no fetch.
    let metrics = |top| ScrollMetrics {
        scroll_top: top,
        client_height: 800,
        scroll_height: 5000,
    };
    assert!(session.evaluate_scroll_end(metrics(0)).is_none());

    // Past 80% of the extent measured after render: fetch the next page.
    let next = session.evaluate_scroll_end(metrics(3400)).unwrap();
    assert_eq!(
        next,
        FetchRequest::Page {
            generation: 0,
            offset: 50,
            limit: 50
        }
    );
    // In flight: a second trigger is ignored.
    assert!(session.evaluate_scroll_end(metrics(4200)).is_none());
}

#[test]
fn test_render_window_is_bounded() {
    let svc = service(2000);
    let mut session = ViewSession::new(options(1000));
    let renderer = VirtualRenderer::new(WindowGeometry::default());
    let mut surface = RecordingSurface {
        viewport: 1000,
        ..Default::default()
    };

    for _ in 0..2 {
        let req = session.request_next_chunk().unwrap();
        fetch(svc.as_ref(), &mut session, &req);
    }
    session.render(&renderer, &mut surface);
    surface.scroll_top = 100_000;
    let window = session.render(&renderer, &mut surface);

    assert_eq!(surface.height, 2000 * 100);
    assert_eq!(surface.scroll_top, 100_000);
    // Ten above the first visible row, ten visible, twenty below.
    assert_eq!(window.start, 990);
    assert_eq!(window.end, 1020);
    assert_eq!(surface.items.len(), 30);
}

#[test]
fn test_filter_then_render() {
    let svc = service(100);
    let mut session = ViewSession::new(options(100));
    let renderer = VirtualRenderer::new(WindowGeometry::default());
    let mut surface = RecordingSurface {
        viewport: 500,
        ..Default::default()
    };

    let req = session.request_next_chunk().unwrap();
    fetch(svc.as_ref(), &mut session, &req);

    let t0 = Instant::now();
    session.set_query("NOEMÍ", t0);
    assert_eq!(session.filtered().len(), 100);
    assert_eq!(
        session.tick(t0 + Duration::from_millis(299)),
        TickOutcome::default()
    );
    assert!(session.tick(t0 + Duration::from_millis(300)).filter_changed);
    assert_eq!(session.filtered().len(), 50);

    session.render(&renderer, &mut surface);
    assert_eq!(surface.height, 50 * 100);
    let (abs, first) = session.view_item(0).unwrap();
    assert_eq!(abs, 1);
    assert_eq!(first.sender, "Noemí");

    assert!(session.apply_query("no such text"));
    session.render(&renderer, &mut surface);
    assert_eq!(surface.placeholder.as_deref(), Some("No messages"));
    assert!(surface.items.is_empty());
}

#[test]
fn test_jump_replaces_and_supersedes() {
    let svc = service(1000);
    let mut session = ViewSession::new(options(50));

    let first = session.request_next_chunk().unwrap();
    let jump = session.request_jump("2021-05-08T15:00:00");
    // The page issued before the jump arrives late.
    assert_eq!(
        fetch(svc.as_ref(), &mut session, &first),
        ApplyOutcome::Stale
    );
    assert!(session.is_loading());

    assert_eq!(
        fetch(svc.as_ref(), &mut session, &jump),
        ApplyOutcome::Replaced { len: 50 }
    );
    assert_eq!(session.base_offset(), 360);
    assert_eq!(session.next_offset(), 410);
    assert_eq!(session.ranges().segments().len(), 1);
    assert_eq!(session.ranges().segments()[0].start, 360);

    // Paging continues after the jump target.
    let next = session.request_next_chunk().unwrap();
    let FetchRequest::Page { offset, .. } = next else {
        panic!("expected page request");
    };
    assert_eq!(offset, 410);
    assert_eq!(
        fetch(svc.as_ref(), &mut session, &next),
        ApplyOutcome::Merged { added: 50 }
    );
    let (abs, _) = session.view_item(0).unwrap();
    assert_eq!(abs, 360);
}

#[test]
fn test_coverage_after_jump() {
    let svc = service(1000);
    let mut session = ViewSession::new(options(100));
    let jump = session.request_jump("2021-05-08T17:20:00");
    fetch(svc.as_ref(), &mut session, &jump);

    let cells = session.ranges().coverage(10, 1000);
    assert_eq!(
        cells,
        vec![false, false, false, false, false, true, false, false, false, false]
    );
}

#[test]
fn test_failed_jump_keeps_messages() {
    let svc = service(200);
    let mut session = ViewSession::new(options(50));
    let req = session.request_next_chunk().unwrap();
    fetch(svc.as_ref(), &mut session, &req);

    let jump = session.request_jump("not a date");
    let outcome = fetch(svc.as_ref(), &mut session, &jump);
    assert!(matches!(outcome, ApplyOutcome::Failed(_)));
    assert!(!session.is_loading());
    assert_eq!(session.messages().len(), 50);
}

#[test]
fn test_worker_round_trip() {
    let svc = service(75);
    let worker = FetchWorker::spawn(svc);
    let mut session = ViewSession::new(options(50));

    while let Some(req) = session.request_next_chunk() {
        assert!(worker.submit(req));
        let response = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        session.apply_response(response);
    }
    assert_eq!(session.messages().len(), 75);
    assert!(session.is_end_reached());
}
