//! Migration framework
//!
//! Provides:
//! - Migration runner with checksums and idempotent application
//! - Embedded SQL migrations for the live-record and ledger tables

mod checksums;
mod embedded;
mod runner;

pub use runner::apply_migrations;
