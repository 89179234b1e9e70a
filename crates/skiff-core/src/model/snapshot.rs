use crate::errors::{Result, SnapshotError};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a snapshot apply invocation.
///
/// `Completed` and `Failed` are terminal: a failed apply is retried as a
/// new invocation, never resumed in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotStatus {
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl SnapshotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotStatus::InProgress => "IN_PROGRESS",
            SnapshotStatus::Completed => "COMPLETED",
            SnapshotStatus::Failed => "FAILED",
        }
    }

    pub fn from_wire(s: &str) -> Option<SnapshotStatus> {
        match s {
            "IN_PROGRESS" => Some(SnapshotStatus::InProgress),
            "COMPLETED" => Some(SnapshotStatus::Completed),
            "FAILED" => Some(SnapshotStatus::Failed),
            _ => None,
        }
    }

    /// Validate a status transition. Only `InProgress -> Completed` and
    /// `InProgress -> Failed` are legal once an entry exists.
    pub fn check_transition(self, to: SnapshotStatus) -> Result<()> {
        match (self, to) {
            (SnapshotStatus::InProgress, SnapshotStatus::Completed)
            | (SnapshotStatus::InProgress, SnapshotStatus::Failed) => Ok(()),
            (from, to) => Err(SnapshotError::InvalidStatusTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            }),
        }
    }
}

/// Ledger entry for one snapshot apply invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// UUIDv7 identifier, assigned by the ledger on create
    pub snapshot_id: String,
    /// Object storage bucket holding the export
    pub bucket: String,
    /// Object storage prefix the export lives under
    pub path: String,
    pub status: SnapshotStatus,
    /// Creation time, Unix milliseconds UTC
    pub created_at: i64,
    /// Populated when status is FAILED
    pub failure_reason: Option<String>,
}
