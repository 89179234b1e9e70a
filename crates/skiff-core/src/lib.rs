//! Skiff Core - snapshot apply domain logic
//!
//! This crate provides the pure (no I/O) parts of the snapshot apply
//! pipeline:
//! - Snapshot, table, and version models shared across the platform
//! - Metadata validation for exported snapshots (location rules, version
//!   compatibility, artifact verification)
//! - The version transformation chain that migrates exported table data
//!   across product releases
//! - The table merge engine that plans per-record CREATE/UPDATE deltas
//!   against a live environment
//!
//! Persistence and orchestration live in `skiff-store` and `skiff-engine`.

pub mod errors;
pub mod metadata;
pub mod merge;
pub mod model;
pub mod transform;

// Re-export commonly used types
pub use errors::{Result, SnapshotError};
pub use merge::{plan_table, MergeAction, MergedRecordDelta, TableSchema};
pub use model::{PlatformVersion, Record, RecordKey, Snapshot, SnapshotStatus, TableName};
pub use transform::{TableData, Transformation, TransformationChain};
