//! Ledger DAO over the `snapshots` table.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use crate::live::SqliteLiveStore;
use rusqlite::OptionalExtension;
use skiff_core::errors::SnapshotError;
use skiff_core::{Snapshot, SnapshotStatus};

/// Ledger contract for snapshot apply invocations
pub trait SnapshotLedger {
    /// Create a new IN_PROGRESS ledger entry and return it with its
    /// assigned snapshot ID
    fn create(&self, bucket: &str, path: &str) -> Result<Snapshot>;

    /// Move an entry to a terminal status, recording the failure reason
    /// when the status is FAILED.
    ///
    /// Illegal transitions (reopening a terminal entry, or moving to
    /// IN_PROGRESS) are rejected.
    fn update_status(
        &self,
        snapshot_id: &str,
        status: SnapshotStatus,
        failure_reason: Option<&str>,
    ) -> Result<()>;

    /// Fetch one ledger entry by snapshot ID
    fn get(&self, snapshot_id: &str) -> Result<Snapshot>;

    /// List all ledger entries, newest first
    fn list(&self) -> Result<Vec<Snapshot>>;
}

fn row_to_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<Snapshot> {
    let status_str: String = row.get(3)?;
    let status = SnapshotStatus::from_wire(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown snapshot status {status_str:?}").into(),
        )
    })?;
    Ok(Snapshot {
        snapshot_id: row.get(0)?,
        bucket: row.get(1)?,
        path: row.get(2)?,
        status,
        created_at: row.get(4)?,
        failure_reason: row.get(5)?,
    })
}

impl SnapshotLedger for SqliteLiveStore {
    fn create(&self, bucket: &str, path: &str) -> Result<Snapshot> {
        let snapshot = Snapshot {
            snapshot_id: uuid::Uuid::now_v7().to_string(),
            bucket: bucket.to_string(),
            path: path.to_string(),
            status: SnapshotStatus::InProgress,
            created_at: chrono::Utc::now().timestamp_millis(),
            failure_reason: None,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snapshots (snapshot_id, bucket, path, status, created_at, failure_reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
                rusqlite::params![
                    snapshot.snapshot_id,
                    snapshot.bucket,
                    snapshot.path,
                    snapshot.status.as_str(),
                    snapshot.created_at,
                ],
            )
            .map_err(from_rusqlite)?;
            Ok(())
        })?;

        tracing::info!(
            snapshot_id = %snapshot.snapshot_id,
            bucket = bucket,
            path = path,
            "Created snapshot ledger entry"
        );
        Ok(snapshot)
    }

    fn update_status(
        &self,
        snapshot_id: &str,
        status: SnapshotStatus,
        failure_reason: Option<&str>,
    ) -> Result<()> {
        let current = self.get(snapshot_id)?;
        current.status.check_transition(status)?;

        self.with_conn(|conn| {
            conn.execute(
                "UPDATE snapshots SET status = ?1, failure_reason = ?2 WHERE snapshot_id = ?3",
                rusqlite::params![status.as_str(), failure_reason, snapshot_id],
            )
            .map_err(from_rusqlite)?;
            Ok(())
        })?;

        tracing::info!(
            snapshot_id = %snapshot_id,
            status = status.as_str(),
            "Updated snapshot status"
        );
        Ok(())
    }

    fn get(&self, snapshot_id: &str) -> Result<Snapshot> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT snapshot_id, bucket, path, status, created_at, failure_reason
                 FROM snapshots WHERE snapshot_id = ?1",
                [snapshot_id],
                row_to_snapshot,
            )
            .optional()
            .map_err(from_rusqlite)?
            .ok_or_else(|| SnapshotError::SnapshotNotFound {
                snapshot_id: snapshot_id.to_string(),
            })
        })
    }

    fn list(&self) -> Result<Vec<Snapshot>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT snapshot_id, bucket, path, status, created_at, failure_reason
                     FROM snapshots
                     ORDER BY created_at DESC, snapshot_id DESC",
                )
                .map_err(from_rusqlite)?;
            let rows: std::result::Result<Vec<_>, _> = stmt
                .query_map([], row_to_snapshot)
                .map_err(from_rusqlite)?
                .collect();
            rows.map_err(from_rusqlite)
        })
    }
}
