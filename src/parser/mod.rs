//! Chat export parsing: the streaming line parser, export dialects and timestamps.

pub mod chat;
pub mod dialect;
pub mod timestamp;

pub use chat::{ChatParser, ParseReport, ParseWarning};
pub use dialect::{ExportDialect, TimestampPolicy};
