//! Table merge engine.
//!
//! Compares schema-current snapshot rows against live rows and produces a
//! merge plan: one delta per affected record, tagged CREATE or UPDATE.
//! Live-only records are never deleted because a snapshot omits them —
//! restoring a historical snapshot must not discard newer local state.

pub mod delta;
pub mod engine;
pub mod schema;

pub use delta::{MergeAction, MergedRecordDelta};
pub use engine::plan_table;
pub use schema::{table_keys, table_schema, TableSchema};
