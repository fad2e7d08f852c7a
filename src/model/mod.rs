//! Core data model types: messages, attachments, chunks and wire pages.

pub mod attachment;
pub mod chunk;
pub mod message;
pub mod page;
