//! The parsed chat message record.

use chrono::NaiveDateTime;

/// A single logical chat message.
///
/// Created once by the parser and never mutated afterwards. The timestamp is
/// the wall-clock time written in the export (exports carry no zone), with
/// sub-second precision dropped.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// When the message was sent, as written in the export.
    pub timestamp: NaiveDateTime,

    /// Sender name, with directional marks stripped.
    pub sender: String,

    /// Message text. Continuation lines are joined with `\n`.
    pub content: String,

    /// Attachment names in the order their markers appeared.
    pub attachments: Vec<String>,

    /// `true` for informational messages (encryption notices and the like).
    pub is_system_message: bool,
}

impl Message {
    /// Whether the message references at least one attachment.
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}
