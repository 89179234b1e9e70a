//! Snapshot apply ledger.
//!
//! Every apply invocation gets one row in the `snapshots` table: created
//! as IN_PROGRESS before any artifact is fetched, then driven to a
//! terminal COMPLETED or FAILED status. Terminal rows are never reopened;
//! a retry is a fresh invocation with its own row.

mod dao;

pub use dao::SnapshotLedger;
