//! Snapshot lifecycle controller.
//!
//! The one entry point callers use to apply a snapshot. Stage order:
//!
//! 1. Validate the bucket and path against the platform naming rules
//!    (before anything is written anywhere)
//! 2. Open an IN_PROGRESS ledger entry
//! 3. Fetch and parse `metadata.json`, enforcing version compatibility
//! 4. Fetch and verify each table's exported artifact
//! 5. Replay version transformations up to the running version
//! 6. Plan the merge per table and commit it through the live store
//! 7. Land the ledger entry in COMPLETED, or FAILED with the reason
//!
//! A failed apply is never resumed; retrying creates a fresh entry.

#![allow(clippy::result_large_err)]

use crate::committer::{commit_plan, CommitReport, MergePlan};
use skiff_core::errors::Result;
use skiff_core::metadata::{
    parse_metadata_bytes, validate_location, verify_table_artifact, METADATA_OBJECT_NAME,
};
use skiff_core::merge::schema::table_schema;
use skiff_core::transform::{builtin_chain, running_version};
use skiff_core::{plan_table, Snapshot, SnapshotStatus, TableData, TableName};
use skiff_store::{LiveStore, ObjectStore, SnapshotLedger};

/// Outcome of a successful apply
#[derive(Debug, Clone)]
pub struct ApplyReport {
    /// The ledger entry, in its terminal COMPLETED state
    pub snapshot: Snapshot,
    pub commit: CommitReport,
}

/// Orchestrates snapshot apply invocations over the three storage
/// collaborators.
pub struct SnapshotLifecycleController<'a, O, L, G> {
    objects: &'a O,
    live: &'a L,
    ledger: &'a G,
}

impl<'a, O, L, G> SnapshotLifecycleController<'a, O, L, G>
where
    O: ObjectStore,
    L: LiveStore,
    G: SnapshotLedger,
{
    pub fn new(objects: &'a O, live: &'a L, ledger: &'a G) -> Self {
        Self {
            objects,
            live,
            ledger,
        }
    }

    /// Apply the snapshot exported at `bucket`/`path` to the live
    /// environment.
    ///
    /// # Errors
    ///
    /// `InvalidSnapshotLocation` is returned before a ledger entry
    /// exists. Every other failure leaves a FAILED entry carrying the
    /// error as its `failure_reason`, and is returned to the caller.
    pub fn apply_snapshot(&self, bucket: &str, path: &str) -> Result<ApplyReport> {
        validate_location(bucket, path)?;

        let mut snapshot = self.ledger.create(bucket, path)?;
        tracing::info!(
            snapshot_id = %snapshot.snapshot_id,
            bucket = bucket,
            path = path,
            "Applying snapshot"
        );

        match self.run_pipeline(bucket, path) {
            Ok(commit) => {
                if let Some(err) = commit.partial_failure() {
                    // Mid-commit failure: the report still names every
                    // table that made it, which goes into the reason.
                    let committed: Vec<&str> =
                        commit.tables.iter().map(|t| t.table.as_str()).collect();
                    let reason = if committed.is_empty() {
                        err.to_string()
                    } else {
                        format!("{err}; committed tables: {}", committed.join(", "))
                    };
                    tracing::warn!(
                        snapshot_id = %snapshot.snapshot_id,
                        code = err.code(),
                        reason = %reason,
                        "Snapshot apply failed mid-commit"
                    );
                    self.ledger.update_status(
                        &snapshot.snapshot_id,
                        SnapshotStatus::Failed,
                        Some(&reason),
                    )?;
                    return Err(err);
                }

                self.ledger.update_status(
                    &snapshot.snapshot_id,
                    SnapshotStatus::Completed,
                    None,
                )?;
                snapshot.status = SnapshotStatus::Completed;
                tracing::info!(
                    snapshot_id = %snapshot.snapshot_id,
                    records = commit.records_written(),
                    "Snapshot applied"
                );
                Ok(ApplyReport { snapshot, commit })
            }
            Err(err) => {
                let reason = err.to_string();
                tracing::warn!(
                    snapshot_id = %snapshot.snapshot_id,
                    code = err.code(),
                    reason = %reason,
                    "Snapshot apply failed"
                );
                self.ledger.update_status(
                    &snapshot.snapshot_id,
                    SnapshotStatus::Failed,
                    Some(&reason),
                )?;
                Err(err)
            }
        }
    }

    /// List every apply invocation recorded in the ledger, newest first.
    ///
    /// # Errors
    ///
    /// `Persistence` when the ledger read fails.
    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        self.ledger.list()
    }

    fn run_pipeline(&self, bucket: &str, path: &str) -> Result<CommitReport> {
        let running = running_version();

        let metadata_key = format!("{}/{}", path.trim_end_matches('/'), METADATA_OBJECT_NAME);
        let metadata_bytes = self.objects.get_object(bucket, &metadata_key)?;
        let metadata = parse_metadata_bytes(&metadata_bytes, &running)?;

        let mut tables = TableData::new();
        for (wire_name, description) in &metadata.table_export_descriptions {
            let Some(table) = TableName::from_wire(wire_name) else {
                // Exports from other deployments may carry tables this
                // environment does not manage.
                tracing::warn!(table = %wire_name, "Skipping unrecognized table export");
                continue;
            };
            let artifact = self.objects.get_object(bucket, &description.export_key)?;
            let records = verify_table_artifact(wire_name, description, &artifact)?;
            tracing::debug!(
                table = table.as_str(),
                records = records.len(),
                "Loaded table export"
            );
            tables.insert(table, records);
        }

        let chain = builtin_chain()?;
        let tables = chain.apply(tables, &metadata.version)?;

        let mut plan = MergePlan::new();
        for (&table, snapshot_records) in &tables {
            let schema = table_schema(table, &running)?;
            let live_records = self.live.scan(table)?;
            let deltas = plan_table(&schema, &live_records, snapshot_records)?;
            plan.insert(table, deltas);
        }

        commit_plan(self.live, &running, &plan)
    }
}
