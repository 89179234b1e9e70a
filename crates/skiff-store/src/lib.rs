//! Skiff Store - persistence for the snapshot apply pipeline
//!
//! Provides:
//! - `ObjectStore`: the narrow object-storage contract the engine fetches
//!   snapshot artifacts through, with a filesystem implementation
//! - `LiveStore`: the per-table key-value contract over the live
//!   control-plane tables, with a SQLite implementation
//! - Embedded SQL migrations for the SQLite backing database
//! - The snapshot ledger DAO (apply invocation records and their status)

pub mod errors;
pub mod live;
pub mod migrations;
pub mod object;
pub mod snapshots;

pub use live::{LiveStore, SqliteLiveStore};
pub use object::{FsObjectStore, ObjectStore};
pub use snapshots::SnapshotLedger;
