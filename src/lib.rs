//! `chatscroll`: progressive viewer for very large chat exports.
//!
//! This crate parses a chat export once into an immutable record store,
//! serves it in bounded chunks (by offset or nearest timestamp) over HTTP or
//! in-process, and provides the client-side pipeline that tracks loaded
//! ranges, filters fetched messages and renders only the visible window.

pub mod attachment;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod server;
pub mod service;
pub mod store;
pub mod tui;
pub mod viewer;
