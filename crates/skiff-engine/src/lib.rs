//! Skiff Engine - snapshot apply orchestration
//!
//! Drives one apply invocation end to end: validate the snapshot's
//! storage coordinates, open a ledger entry, fetch and verify the
//! exported artifacts, replay version transformations, plan the
//! per-table merge, and commit the plan through the live store. Every
//! failure after the ledger entry exists lands the entry in FAILED with
//! the reason recorded.

pub mod committer;
pub mod controller;

pub use committer::{commit_plan, CommitReport, TableCommitFailure, TableCommitStats};
pub use controller::{ApplyReport, SnapshotLifecycleController};
