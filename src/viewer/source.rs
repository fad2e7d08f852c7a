//! Where a viewer session gets its pages from, and a background fetcher.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::model::chunk::TimeRange;
use crate::model::page::MessagePage;
use crate::service::ChatService;

use super::session::{FetchRequest, FetchResponse};

/// A provider of message pages.
pub trait ChunkSource: Send + Sync {
    fn fetch_page(&self, offset: usize, limit: usize) -> Result<MessagePage>;
    fn fetch_by_time(&self, timestamp: &str, limit: usize) -> Result<MessagePage>;
    fn time_range(&self) -> Result<Option<TimeRange>>;
}

impl ChunkSource for ChatService {
    fn fetch_page(&self, offset: usize, limit: usize) -> Result<MessagePage> {
        self.messages(to_i64(offset), Some(to_i64(limit)))
    }

    fn fetch_by_time(&self, timestamp: &str, limit: usize) -> Result<MessagePage> {
        self.messages_by_time(timestamp, Some(to_i64(limit)))
    }

    fn time_range(&self) -> Result<Option<TimeRange>> {
        ChatService::time_range(self)
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Run one request against a source.
pub fn execute(source: &dyn ChunkSource, request: &FetchRequest) -> FetchResponse {
    let result = match request {
        FetchRequest::Page { offset, limit, .. } => source.fetch_page(*offset, *limit),
        FetchRequest::Jump {
            timestamp, limit, ..
        } => source.fetch_by_time(timestamp, *limit),
    };
    FetchResponse {
        generation: request.generation(),
        jump: request.is_jump(),
        result: result.map_err(|e| e.to_string()),
    }
}

/// Executes fetch requests on a dedicated thread so the UI loop never blocks.
pub struct FetchWorker {
    requests: Option<Sender<FetchRequest>>,
    responses: Receiver<FetchResponse>,
    handle: Option<JoinHandle<()>>,
}

impl FetchWorker {
    pub fn spawn(source: Arc<dyn ChunkSource>) -> Self {
        let (req_tx, req_rx) = mpsc::channel::<FetchRequest>();
        let (resp_tx, resp_rx) = mpsc::channel::<FetchResponse>();

        let handle = std::thread::Builder::new()
            .name("chatscroll-fetch".into())
            .spawn(move || {
                for request in req_rx {
                    debug!(?request, "Fetching");
                    let response = execute(source.as_ref(), &request);
                    if resp_tx.send(response).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| warn!(error = %e, "Cannot spawn fetch thread"))
            .ok();

        Self {
            requests: Some(req_tx),
            responses: resp_rx,
            handle,
        }
    }

    /// Queue a request. Returns `false` if the worker is gone.
    pub fn submit(&self, request: FetchRequest) -> bool {
        match (&self.requests, &self.handle) {
            (Some(tx), Some(_)) => tx.send(request).is_ok(),
            _ => false,
        }
    }

    /// A finished response, if one is ready.
    pub fn try_recv(&self) -> Option<FetchResponse> {
        self.responses.try_recv().ok()
    }

    /// Wait up to `timeout` for a response.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FetchResponse> {
        match self.responses.recv_timeout(timeout) {
            Ok(r) => Some(r),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for FetchWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
