//! Record store: the parsed message sequence, its load-once cell and source fingerprint.

pub mod cell;
pub mod fingerprint;
pub mod record_store;

pub use cell::StoreCell;
pub use fingerprint::SourceFingerprint;
pub use record_store::RecordStore;
