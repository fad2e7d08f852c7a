//! Client-side browsing pipeline: loaded ranges, search filter, virtual
//! window and the session state machine tying them together.

pub mod debounce;
pub mod filter;
pub mod ranges;
pub mod session;
pub mod source;
pub mod window;

pub use filter::{FilteredView, Searchable};
pub use ranges::{LoadedRanges, LoadedSegment};
pub use session::{
    ApplyOutcome, FetchRequest, FetchResponse, ScrollMetrics, SessionOptions, ViewSession,
};
pub use source::{ChunkSource, FetchWorker};
pub use window::{Surface, VirtualRenderer, VisibleWindow, WindowGeometry};
