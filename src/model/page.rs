//! Wire types exchanged between the server and viewer clients.

use chrono::NaiveDateTime;

use super::attachment::AttachmentInfo;

/// A message as delivered to clients, with attachments resolved.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageView {
    pub timestamp: NaiveDateTime,
    pub sender: String,
    pub content: String,
    pub is_system_message: bool,
    pub attachments: Vec<AttachmentInfo>,
}

/// One pagination response.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessagePage {
    pub messages: Vec<MessageView>,
    pub offset: usize,
    pub limit: usize,
    pub total_messages: usize,
    pub has_more: bool,
}

impl MessagePage {
    /// Index one past the last message of this page.
    pub fn end(&self) -> usize {
        self.offset + self.messages.len()
    }
}

/// Server statistics returned by `/stats`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServerStats {
    pub file_size: u64,
    pub file_size_mb: f64,
    pub attachment_dir: Option<String>,
    pub messages_cached: usize,
    pub total_messages: usize,
    pub parse_warnings: usize,
}

/// Result of a reload request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReloadOutcome {
    /// `false` when the source was unchanged and the cached store was kept.
    pub reloaded: bool,
    pub total_messages: usize,
}
