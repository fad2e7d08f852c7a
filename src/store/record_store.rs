//! The parsed, immutable message sequence with its timestamp index.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::info;

use crate::error::Result;
use crate::model::chunk::{Chunk, TimeRange};
use crate::model::message::Message;
use crate::parser::{ChatParser, ExportDialect, ParseReport, ParseWarning, TimestampPolicy};

use super::fingerprint::SourceFingerprint;

/// Ordered messages of one chat export, in parse order.
///
/// Keeps a parallel array of timestamps so the locator can binary-search it
/// without touching the messages themselves.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    messages: Vec<Message>,
    timestamps: Vec<NaiveDateTime>,
    warnings: Vec<ParseWarning>,
    fingerprint: Option<SourceFingerprint>,
    source_bytes: u64,
}

impl RecordStore {
    /// Build a store from an in-memory message list.
    pub fn new(messages: Vec<Message>) -> Self {
        let timestamps = messages.iter().map(|m| m.timestamp).collect();
        Self {
            messages,
            timestamps,
            ..Self::default()
        }
    }

    /// Build a store from a finished parse run.
    pub fn from_report(report: ParseReport, fingerprint: Option<SourceFingerprint>) -> Self {
        let mut store = Self::new(report.messages);
        store.warnings = report.warnings;
        store.source_bytes = report.bytes;
        store.fingerprint = fingerprint;
        store
    }

    /// Parse `path` and build the store, remembering the source fingerprint.
    pub fn load(
        path: &Path,
        dialect: ExportDialect,
        policy: TimestampPolicy,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<Self> {
        let start = std::time::Instant::now();
        // Fingerprint first so a write during parsing shows up as a change.
        let fingerprint = SourceFingerprint::capture(path)?;
        let report = ChatParser::parse_file(path, dialect, policy, progress)?;
        let store = Self::from_report(report, Some(fingerprint));
        info!(
            path = %path.display(),
            messages = store.len(),
            warnings = store.warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Record store built"
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn fingerprint(&self) -> Option<&SourceFingerprint> {
        self.fingerprint.as_ref()
    }

    /// Bytes read from the source file (0 for in-memory stores).
    pub fn source_bytes(&self) -> u64 {
        self.source_bytes
    }

    /// Borrow `[offset, offset + limit)`, clamped to the store.
    ///
    /// Negative offsets clamp to 0 and non-positive limits give an empty
    /// chunk, so callers can forward raw client input.
    pub fn slice(&self, offset: i64, limit: i64) -> Chunk<'_> {
        let total = self.messages.len();
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX).min(total);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        let end = offset.saturating_add(limit).min(total);
        let messages = &self.messages[offset..end];
        Chunk {
            messages,
            offset,
            limit,
            has_more: end < total,
            total,
        }
    }

    /// Index of the record whose timestamp is closest to `target`.
    ///
    /// Targets before the first record map to 0 and after the last to
    /// `len() - 1`. Between two neighbours the smaller distance wins, ties
    /// going to the earlier one. `None` only when the store is empty.
    pub fn nearest_index(&self, target: NaiveDateTime) -> Option<usize> {
        let ts = &self.timestamps;
        if ts.is_empty() {
            return None;
        }
        // First index whose timestamp is >= target.
        let left = ts.partition_point(|t| *t < target);
        if left == 0 {
            return Some(0);
        }
        if left == ts.len() {
            return Some(ts.len() - 1);
        }
        let right = left - 1;
        let after = ts[left] - target;
        let before = target - ts[right];
        Some(if before <= after { right } else { left })
    }

    /// First and last timestamps in store order.
    pub fn time_range(&self) -> Option<TimeRange> {
        let first = *self.timestamps.first()?;
        let last = *self.timestamps.last()?;
        Some(TimeRange {
            first_timestamp: first,
            last_timestamp: last,
            total_messages: self.messages.len(),
        })
    }

    /// Total attachment references across all messages.
    pub fn attachment_count(&self) -> usize {
        self.messages.iter().map(|m| m.attachments.len()).sum()
    }

    /// The `n` most active non-system senders, busiest first.
    pub fn top_senders(&self, n: usize) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for m in self.messages.iter().filter(|m| !m.is_system_message) {
            *counts.entry(m.sender.as_str()).or_insert(0) += 1;
        }
        let mut ranked: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(sender, count)| (sender.to_string(), count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 5, 8)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn msg(minutes: i64, sender: &str) -> Message {
        Message {
            timestamp: base() + Duration::minutes(minutes),
            sender: sender.into(),
            content: format!("m{minutes}"),
            attachments: Vec::new(),
            is_system_message: false,
        }
    }

    fn store_of(minutes: &[i64]) -> RecordStore {
        RecordStore::new(minutes.iter().map(|m| msg(*m, "Marc")).collect())
    }

    #[test]
    fn test_slice_lengths_and_has_more() {
        let store = store_of(&(0..10).collect::<Vec<_>>());
        for offset in -3..14i64 {
            for limit in -2..14i64 {
                let chunk = store.slice(offset, limit);
                let expect = (limit.max(0) as usize).min(10usize.saturating_sub(offset.max(0) as usize));
                assert_eq!(chunk.messages.len(), expect, "offset={offset} limit={limit}");
                assert_eq!(chunk.has_more, chunk.end() < 10);
                assert_eq!(chunk.total, 10);
            }
        }
    }

    #[test]
    fn test_slices_concatenate() {
        let store = store_of(&(0..20).collect::<Vec<_>>());
        let mut joined = store.slice(0, 7).messages.to_vec();
        joined.extend_from_slice(store.slice(7, 5).messages);
        assert_eq!(joined.as_slice(), store.slice(0, 12).messages);
    }

    #[test]
    fn test_slice_offset_past_end() {
        let store = store_of(&[0, 1, 2]);
        let chunk = store.slice(50, 10);
        assert!(chunk.messages.is_empty());
        assert_eq!(chunk.offset, 3);
        assert!(!chunk.has_more);
    }

    #[test]
    fn test_nearest_bounds_and_exact() {
        let store = store_of(&[0, 10, 20, 30]);
        assert_eq!(store.nearest_index(base() - Duration::days(1)), Some(0));
        assert_eq!(store.nearest_index(base() + Duration::days(1)), Some(3));
        assert_eq!(store.nearest_index(base() + Duration::minutes(20)), Some(2));
    }

    #[test]
    fn test_nearest_picks_closer_and_ties_go_earlier() {
        let store = store_of(&[0, 10, 20]);
        assert_eq!(store.nearest_index(base() + Duration::minutes(13)), Some(1));
        assert_eq!(store.nearest_index(base() + Duration::minutes(17)), Some(2));
        assert_eq!(store.nearest_index(base() + Duration::minutes(15)), Some(1));
    }

    #[test]
    fn test_nearest_empty() {
        assert_eq!(RecordStore::default().nearest_index(base()), None);
        assert!(RecordStore::default().time_range().is_none());
    }

    #[test]
    fn test_time_range_is_positional() {
        let store = store_of(&[30, 0, 10]);
        let range = store.time_range().unwrap();
        assert_eq!(range.first_timestamp, base() + Duration::minutes(30));
        assert_eq!(range.last_timestamp, base() + Duration::minutes(10));
        assert_eq!(range.total_messages, 3);
    }

    #[test]
    fn test_top_senders() {
        let mut messages = vec![msg(0, "Noemí"), msg(1, "Marc"), msg(2, "Marc")];
        let mut notice = msg(3, "Grup");
        notice.is_system_message = true;
        messages.push(notice);
        let store = RecordStore::new(messages);
        assert_eq!(
            store.top_senders(5),
            vec![("Marc".to_string(), 2), ("Noemí".to_string(), 1)]
        );
        assert_eq!(store.top_senders(1).len(), 1);
    }
}
