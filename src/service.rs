//! Pagination and time-jump service over the shared record store.
//!
//! [`ChatService`] is the single object the HTTP layer and in-process viewers
//! talk to. It owns the load-once store cell, the attachment resolver and the
//! paging limits, and turns borrowed [`Chunk`]s into wire [`MessagePage`]s.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::attachment::AttachmentResolver;
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::model::chunk::{Chunk, TimeRange};
use crate::model::page::{MessagePage, MessageView, ReloadOutcome, ServerStats};
use crate::parser::timestamp::parse_query_timestamp;
use crate::parser::{ExportDialect, TimestampPolicy};
use crate::store::{RecordStore, StoreCell};

/// Paging limits and parsing options used by a [`ChatService`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub dialect: ExportDialect,
    pub policy: TimestampPolicy,
    pub attachment_cache_size: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&Config::default(), None)
    }
}

impl ServiceSettings {
    pub fn from_config(config: &Config, dialect_override: Option<&str>) -> Self {
        Self {
            default_limit: config.server.default_limit,
            max_limit: config.server.max_limit.max(1),
            dialect: config.parser.dialect(dialect_override),
            policy: config.parser.timestamp_policy,
            attachment_cache_size: config.performance.attachment_cache_size,
        }
    }
}

/// Answers chunk, time-jump, attachment and stats requests.
pub struct ChatService {
    source: Option<PathBuf>,
    settings: ServiceSettings,
    cell: StoreCell,
    attachments: AttachmentResolver,
}

impl ChatService {
    /// Serve the export at `source`; the store is built on first use.
    pub fn new(
        source: impl Into<PathBuf>,
        attachment_root: Option<PathBuf>,
        settings: ServiceSettings,
    ) -> Self {
        let attachments = AttachmentResolver::new(attachment_root, settings.attachment_cache_size);
        Self {
            source: Some(source.into()),
            settings,
            cell: StoreCell::new(),
            attachments,
        }
    }

    /// Serve an already-built store. Reloads are no-ops.
    pub fn from_store(
        store: RecordStore,
        attachment_root: Option<PathBuf>,
        settings: ServiceSettings,
    ) -> Self {
        let attachments = AttachmentResolver::new(attachment_root, settings.attachment_cache_size);
        Self {
            source: None,
            settings,
            cell: StoreCell::with_store(store),
            attachments,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn attachments(&self) -> &AttachmentResolver {
        &self.attachments
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.is_loaded()
    }

    /// The shared store, parsing the source if this is the first use.
    pub fn store(&self) -> Result<Arc<RecordStore>> {
        self.load(None)
    }

    /// Like [`store`](Self::store), reporting parse progress if a parse runs.
    pub fn load(&self, progress: Option<&dyn Fn(u64, u64)>) -> Result<Arc<RecordStore>> {
        self.cell
            .get_or_load(|| self.parse_source(progress))
            .map_err(not_initialized)
    }

    /// One page starting at `offset`. `limit = None` uses the default page
    /// size; every limit is capped at the configured maximum.
    pub fn messages(&self, offset: i64, limit: Option<i64>) -> Result<MessagePage> {
        let store = self.store()?;
        let chunk = store.slice(offset, self.effective_limit(limit));
        debug!(
            offset = chunk.offset,
            returned = chunk.messages.len(),
            total = chunk.total,
            "Served page"
        );
        Ok(self.page_from_chunk(&chunk))
    }

    /// One page starting at the record nearest to the timestamp in `raw`.
    pub fn messages_by_time(&self, raw: &str, limit: Option<i64>) -> Result<MessagePage> {
        let target = parse_query_timestamp(raw)
            .ok_or_else(|| ChatError::InvalidQueryTimestamp(raw.to_string()))?;
        let store = self.store()?;
        let index = store.nearest_index(target).unwrap_or(0);
        debug!(at = %target, index, "Located nearest message");
        let chunk = store.slice(index as i64, self.effective_limit(limit));
        Ok(self.page_from_chunk(&chunk))
    }

    /// First and last timestamps, `None` for an empty export.
    pub fn time_range(&self) -> Result<Option<TimeRange>> {
        Ok(self.store()?.time_range())
    }

    /// Resolve an attachment name to a file path inside the attachment root.
    pub fn attachment_path(&self, name: &str) -> Result<PathBuf> {
        self.attachments.resolve(name)
    }

    pub fn stats(&self) -> Result<ServerStats> {
        let store = self.store()?;
        let file_size = match &self.source {
            Some(path) => std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            None => store.source_bytes(),
        };
        Ok(ServerStats {
            file_size,
            file_size_mb: (file_size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
            attachment_dir: self
                .attachments
                .root()
                .map(|p| p.display().to_string()),
            messages_cached: store.len(),
            total_messages: store.len(),
            parse_warnings: store.warnings().len(),
        })
    }

    /// Re-parse the source if it changed on disk, or unconditionally with
    /// `force`. Attachment metadata is forgotten whenever a parse runs.
    pub fn reload(&self, force: bool) -> Result<ReloadOutcome> {
        let Some(path) = &self.source else {
            let total = self.store()?.len();
            return Ok(ReloadOutcome {
                reloaded: false,
                total_messages: total,
            });
        };

        if let Some(current) = self.cell.get() {
            if !force {
                if let Some(fp) = current.fingerprint() {
                    if fp.matches(path)? {
                        debug!("Source unchanged, keeping record store");
                        return Ok(ReloadOutcome {
                            reloaded: false,
                            total_messages: current.len(),
                        });
                    }
                }
            }
        }

        let store = self
            .cell
            .reload(|| self.parse_source(None))
            .map_err(not_initialized)?;
        self.attachments.clear_cache();
        info!(path = %path.display(), messages = store.len(), force, "Reloaded chat export");
        Ok(ReloadOutcome {
            reloaded: true,
            total_messages: store.len(),
        })
    }

    /// Resolve attachments and convert a chunk to its wire form.
    pub fn page_from_chunk(&self, chunk: &Chunk<'_>) -> MessagePage {
        let messages = chunk
            .messages
            .iter()
            .map(|m| MessageView {
                timestamp: m.timestamp,
                sender: m.sender.clone(),
                content: m.content.clone(),
                is_system_message: m.is_system_message,
                attachments: self.attachments.describe_all(&m.attachments),
            })
            .collect();
        MessagePage {
            messages,
            offset: chunk.offset,
            limit: chunk.limit,
            total_messages: chunk.total,
            has_more: chunk.has_more,
        }
    }

    fn effective_limit(&self, limit: Option<i64>) -> i64 {
        let max = i64::try_from(self.settings.max_limit).unwrap_or(i64::MAX);
        let default = i64::try_from(self.settings.default_limit).unwrap_or(max);
        limit.unwrap_or(default).min(max)
    }

    fn parse_source(&self, progress: Option<&dyn Fn(u64, u64)>) -> Result<RecordStore> {
        let path = self
            .source
            .as_deref()
            .ok_or_else(|| ChatError::NotInitialized("no chat export configured".into()))?;
        RecordStore::load(
            path,
            self.settings.dialect.clone(),
            self.settings.policy,
            progress,
        )
    }
}

fn not_initialized(e: ChatError) -> ChatError {
    match e {
        ChatError::NotInitialized(_) => e,
        other => ChatError::NotInitialized(other.to_string()),
    }
}
