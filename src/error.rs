//! Centralized error types for chatscroll.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the chatscroll library.
#[derive(Error, Debug)]
pub enum ChatError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The chat export does not exist.
    #[error("Chat export not found: {0}")]
    FileNotFound(PathBuf),

    /// A header line carried a timestamp that no known format accepts
    /// (only raised under the `strict` timestamp policy).
    #[error("Unparseable timestamp '{value}' on line {line}")]
    InvalidTimestamp { line: u64, value: String },

    /// A query timestamp could not be parsed.
    #[error("Invalid timestamp parameter: {0}")]
    InvalidQueryTimestamp(String),

    /// An attachment name failed sanitisation or escaped the attachment root.
    #[error("Invalid attachment name: {0}")]
    InvalidAttachmentName(String),

    /// No attachment directory is configured.
    #[error("Attachment directory not configured")]
    AttachmentsDisabled,

    /// The requested attachment does not exist.
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    /// The record store could not be built.
    #[error("Server not initialized: {0}")]
    NotInitialized(String),
}

/// Convenience alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `ChatError::io`).
impl From<std::io::Error> for ChatError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
