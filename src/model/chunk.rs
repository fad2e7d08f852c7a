//! Read-only projections over the record store.

use chrono::NaiveDateTime;

use super::message::Message;

/// A bounded slice of the message sequence, borrowed from the store.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    /// The messages in `[offset, offset + messages.len())`.
    pub messages: &'a [Message],
    /// Effective start index after clamping.
    pub offset: usize,
    /// Requested limit after clamping negatives to zero.
    pub limit: usize,
    /// `offset + messages.len() < total`.
    pub has_more: bool,
    /// Number of records in the store.
    pub total: usize,
}

impl Chunk<'_> {
    /// Index one past the last message of this chunk.
    pub fn end(&self) -> usize {
        self.offset + self.messages.len()
    }
}

/// First and last timestamps of the store, in store order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    pub first_timestamp: NaiveDateTime,
    pub last_timestamp: NaiveDateTime,
    pub total_messages: usize,
}
