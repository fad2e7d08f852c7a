//! Streaming chat-export parser.
//!
//! Turns the exporter's text into an ordered list of [`Message`]s with a
//! two-state machine (no open message / accumulating a message). Lines are fed
//! one at a time, so the same code serves in-memory strings and files of any
//! size read through a buffered reader. Tolerant of malformed input: bad
//! timestamps and stray lines become [`ParseWarning`]s, not failures.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::error::{ChatError, Result};
use crate::model::message::Message;

use super::dialect::{ExportDialect, TimestampPolicy, DIRECTIONAL_MARK};
use super::timestamp::{parse_export_timestamp, truncate_subsec};

/// A marker header from the same sender folds into the open message only if
/// its timestamp is at most this many seconds away from the message's.
const FOLD_WINDOW_SECS: i64 = 60;

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Report progress every 4 MB.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// `[date time] sender: content`, optionally preceded by a directional mark.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\x{200E}?\[(\d{1,2}/\d{1,2}/\d{2,4})\s+(\d{1,2}:\d{2}:\d{2})\]\s+([^:]+):\s+(.*)$")
        .expect("header pattern is valid")
});

/// A recoverable irregularity found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A header timestamp matched no format and was substituted.
    BadTimestamp { line: u64, value: String },
    /// Continuation text appeared before the first message.
    OrphanLine { line: u64 },
    /// An attachment marker appeared before the first message.
    OrphanAttachment { line: u64, name: String },
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadTimestamp { line, value } => {
                write!(f, "line {line}: unparseable timestamp '{value}'")
            }
            Self::OrphanLine { line } => write!(f, "line {line}: text before the first message"),
            Self::OrphanAttachment { line, name } => {
                write!(f, "line {line}: attachment '{name}' before the first message")
            }
        }
    }
}

/// Everything a parse run produced.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    /// Messages in input order.
    pub messages: Vec<Message>,
    /// Irregularities, in input order.
    pub warnings: Vec<ParseWarning>,
    /// Physical lines seen (blank ones included).
    pub lines: u64,
    /// Bytes consumed (0 when parsing from a string).
    pub bytes: u64,
}

/// The fields of a matched header line, borrowed from the line.
struct Header<'l> {
    date: &'l str,
    time: &'l str,
    raw_sender: &'l str,
    content: &'l str,
}

impl<'l> Header<'l> {
    fn from_captures(caps: &Captures<'l>) -> Option<Self> {
        Some(Self {
            date: caps.get(1)?.as_str(),
            time: caps.get(2)?.as_str(),
            raw_sender: caps.get(3)?.as_str(),
            content: caps.get(4)?.as_str(),
        })
    }

    fn sender(&self) -> &'l str {
        self.raw_sender.trim_matches(DIRECTIONAL_MARK)
    }
}

/// Line-driven chat parser.
///
/// Feed lines with [`feed_line`](Self::feed_line) and collect the result with
/// [`finish`](Self::finish).
pub struct ChatParser {
    dialect: ExportDialect,
    policy: TimestampPolicy,
    marker_re: Regex,
    current: Option<Message>,
    messages: Vec<Message>,
    warnings: Vec<ParseWarning>,
    line_no: u64,
    last_good: Option<NaiveDateTime>,
}

impl ChatParser {
    /// Create a parser for the given dialect and timestamp policy.
    pub fn new(dialect: ExportDialect, policy: TimestampPolicy) -> Self {
        let marker_re = build_marker_regex(&dialect);
        Self {
            dialect,
            policy,
            marker_re,
            current: None,
            messages: Vec::new(),
            warnings: Vec::new(),
            line_no: 0,
            last_good: None,
        }
    }

    /// Parse a whole export held in memory.
    pub fn parse_str(
        text: &str,
        dialect: ExportDialect,
        policy: TimestampPolicy,
    ) -> Result<ParseReport> {
        let mut parser = Self::new(dialect, policy);
        for line in text.lines() {
            parser.feed_line(line)?;
        }
        Ok(parser.finish())
    }

    /// Parse an export file, streaming it line by line.
    ///
    /// Lines that are not valid UTF-8 are decoded as Windows-1252. A UTF-8
    /// BOM at the start of the file is skipped. `progress` receives
    /// `(bytes_read, file_size)`.
    pub fn parse_file(
        path: impl AsRef<Path>,
        dialect: ExportDialect,
        policy: TimestampPolicy,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<ParseReport> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ChatError::FileNotFound(path.to_path_buf())
            } else {
                ChatError::io(path, e)
            }
        })?;
        let file_size = metadata.len();
        let file = File::open(path).map_err(|e| ChatError::io(path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut parser = Self::new(dialect, policy);
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);
        let mut bytes_read: u64 = 0;
        let mut last_progress: u64 = 0;
        let mut first_line = true;

        loop {
            line_buf.clear();
            let n = reader
                .read_until(b'\n', &mut line_buf)
                .map_err(|e| ChatError::io(path, e))?;
            if n == 0 {
                break;
            }
            bytes_read += n as u64;

            let mut bytes = line_buf.as_slice();
            if first_line && bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
                bytes = &bytes[3..];
            }
            first_line = false;

            let line = decode_line(bytes);
            parser.feed_line(&line)?;

            if let Some(cb) = progress {
                if bytes_read - last_progress >= PROGRESS_INTERVAL {
                    cb(bytes_read, file_size);
                    last_progress = bytes_read;
                }
            }
        }

        if let Some(cb) = progress {
            cb(file_size, file_size);
        }

        let mut report = parser.finish();
        report.bytes = bytes_read;
        debug!(
            path = %path.display(),
            messages = report.messages.len(),
            warnings = report.warnings.len(),
            "Parsed chat export"
        );
        Ok(report)
    }

    /// Process one physical line.
    ///
    /// Only fails under [`TimestampPolicy::Strict`].
    pub fn feed_line(&mut self, raw: &str) -> Result<()> {
        self.line_no += 1;
        let line = raw.trim();
        if line.is_empty() {
            return Ok(());
        }

        let header = HEADER_RE
            .captures(line)
            .and_then(|caps| Header::from_captures(&caps));

        if self.marker_re.is_match(line) {
            let belongs_to_current = match (&self.current, &header) {
                (Some(current), Some(h)) => {
                    current.sender == h.sender() && within_fold_window(current, h)
                }
                (Some(_), None) => true,
                (None, _) => false,
            };
            if belongs_to_current {
                // Marker line belonging to the open message.
                let text = header.as_ref().map_or(line, |h| h.content);
                self.attach_to_current(text);
                return Ok(());
            }
            if header.is_none() {
                for name in self.marker_names(line) {
                    debug!(line = self.line_no, name = %name, "Attachment before first message");
                    self.warnings.push(ParseWarning::OrphanAttachment {
                        line: self.line_no,
                        name,
                    });
                }
                return Ok(());
            }
        }

        if let Some(h) = header {
            return self.begin_message(&h);
        }

        match self.current.as_mut() {
            Some(current) => {
                current.content.push('\n');
                current.content.push_str(line);
            }
            None => {
                debug!(line = self.line_no, "Text before first message");
                self.warnings
                    .push(ParseWarning::OrphanLine { line: self.line_no });
            }
        }
        Ok(())
    }

    /// Emit the last open message and return everything parsed.
    pub fn finish(mut self) -> ParseReport {
        if let Some(current) = self.current.take() {
            self.messages.push(current);
        }
        ParseReport {
            messages: self.messages,
            warnings: self.warnings,
            lines: self.line_no,
            bytes: 0,
        }
    }

    /// Start a new message from a header, emitting the previous one.
    fn begin_message(&mut self, header: &Header<'_>) -> Result<()> {
        if let Some(previous) = self.current.take() {
            self.messages.push(previous);
        }

        let timestamp = match parse_export_timestamp(header.date, header.time) {
            Some(ts) => {
                self.last_good = Some(ts);
                ts
            }
            None => self.fallback_timestamp(header)?,
        };

        let attachments = self.marker_names(header.content);
        let content = self.strip_markers(header.content);
        let is_system_message = self.dialect.is_system(header.raw_sender, &content);

        self.current = Some(Message {
            timestamp,
            sender: header.sender().to_string(),
            content,
            attachments,
            is_system_message,
        });
        Ok(())
    }

    /// Apply the timestamp policy to an unparseable header timestamp.
    fn fallback_timestamp(&mut self, header: &Header<'_>) -> Result<NaiveDateTime> {
        let value = format!("{} {}", header.date, header.time);
        if self.policy == TimestampPolicy::Strict {
            return Err(ChatError::InvalidTimestamp {
                line: self.line_no,
                value,
            });
        }

        let substitute = match self.policy {
            TimestampPolicy::Previous => self
                .last_good
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH.naive_utc()),
            _ => truncate_subsec(Local::now().naive_local()),
        };
        warn!(
            line = self.line_no,
            value = %value,
            substitute = %substitute,
            "Unparseable timestamp, substituting"
        );
        self.warnings.push(ParseWarning::BadTimestamp {
            line: self.line_no,
            value,
        });
        Ok(substitute)
    }

    /// Append the markers of `text` to the open message; leftover text
    /// becomes a continuation line.
    fn attach_to_current(&mut self, text: &str) {
        let names = self.marker_names(text);
        let rest = self.strip_markers(text);
        if let Some(current) = self.current.as_mut() {
            current.attachments.extend(names);
            if !rest.is_empty() {
                current.content.push('\n');
                current.content.push_str(&rest);
            }
        }
    }

    fn marker_names(&self, text: &str) -> Vec<String> {
        self.marker_re
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }

    fn strip_markers(&self, text: &str) -> String {
        self.marker_re
            .replace_all(text, "")
            .trim()
            .trim_matches(DIRECTIONAL_MARK)
            .to_string()
    }
}

/// Whether a marker header is close enough in time to the open message to
/// be part of it. Unparseable header timestamps never fold.
fn within_fold_window(current: &Message, header: &Header<'_>) -> bool {
    parse_export_timestamp(header.date, header.time)
        .is_some_and(|ts| (ts - current.timestamp).num_seconds().abs() <= FOLD_WINDOW_SECS)
}

/// Build `‎<(?:label|label…):\s+(name)>` for the dialect's labels.
fn build_marker_regex(dialect: &ExportDialect) -> Regex {
    let mut labels: Vec<String> = dialect
        .attachment_labels
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(regex::escape)
        .collect();
    if labels.is_empty() {
        labels = ExportDialect::catalan()
            .attachment_labels
            .iter()
            .map(|l| regex::escape(l))
            .collect();
    }
    let pattern = format!(r"\x{{200E}}<(?:{}):\s+([^>]+)>", labels.join("|"));
    Regex::new(&pattern).expect("escaped labels form a valid pattern")
}

/// Decode one raw line, falling back to Windows-1252 for invalid UTF-8.
fn decode_line(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling(bytes)
            .0,
    }
}
