//! Persistence committer.
//!
//! Writes a computed merge plan through the live store, one table at a
//! time in dependency order. Each table's deltas go down as a single
//! batch; a batch that fails stops the commit there, leaving earlier
//! tables applied and later tables untouched. There is no cross-table
//! rollback: the plan is convergent, so the recovery path is a fresh
//! apply of the same snapshot. The report always names which tables
//! committed, so an operator can tell exactly how far a failed commit
//! got.

#![allow(clippy::result_large_err)]

use skiff_core::errors::{Result, SnapshotError};
use skiff_core::merge::schema::table_schema;
use skiff_core::model::record_key;
use skiff_core::{MergeAction, MergedRecordDelta, PlatformVersion, Record, RecordKey, TableName};
use skiff_store::LiveStore;
use std::collections::BTreeMap;

/// A full merge plan: deltas per table, keyed by table
pub type MergePlan = BTreeMap<TableName, Vec<MergedRecordDelta>>;

/// Per-table outcome of a committed plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCommitStats {
    pub table: TableName,
    pub created: usize,
    pub updated: usize,
}

/// The table whose batch write failed, aborting the commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCommitFailure {
    pub table: TableName,
    pub cause: String,
}

/// Outcome of a commit attempt.
///
/// `tables` lists every table that fully committed, in commit order.
/// When `failed` is set, that table's batch was rejected and every table
/// after it in the merge order was not attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub tables: Vec<TableCommitStats>,
    pub failed: Option<TableCommitFailure>,
}

impl CommitReport {
    pub fn records_written(&self) -> usize {
        self.tables.iter().map(|t| t.created + t.updated).sum()
    }

    /// The partial-failure error for this report, if any table failed
    pub fn partial_failure(&self) -> Option<SnapshotError> {
        self.failed
            .as_ref()
            .map(|f| SnapshotError::CommitPartialFailure {
                table: f.table.as_str().to_string(),
                cause: f.cause.clone(),
            })
    }
}

fn batch_entries(
    table: TableName,
    version: &PlatformVersion,
    deltas: &[MergedRecordDelta],
) -> Result<(Vec<(RecordKey, Record)>, TableCommitStats)> {
    let schema = table_schema(table, version)?;
    let mut stats = TableCommitStats {
        table,
        created: 0,
        updated: 0,
    };

    let mut entries = Vec::with_capacity(deltas.len());
    for delta in deltas {
        let Some(resolved) = delta.resolved_record() else {
            // DELETE deltas have no resolved record and no commit path.
            continue;
        };
        match delta.action() {
            MergeAction::Create => stats.created += 1,
            MergeAction::Update => stats.updated += 1,
            MergeAction::Delete => continue,
        }
        entries.push((record_key(resolved, &schema.keys)?, resolved.clone()));
    }
    Ok((entries, stats))
}

/// Commit a merge plan through the live store.
///
/// Tables commit sequentially in [`TableName::MERGE_ORDER`]; tables the
/// plan does not mention are skipped. A failing table batch stops the
/// commit and is recorded in the report's `failed` field rather than
/// returned as an error, so the caller still sees which tables made it.
///
/// # Errors
///
/// `InvalidSnapshotFormat` when a resolved record is missing its key
/// fields; this is a planning defect and aborts before any write for
/// that table.
pub fn commit_plan<L: LiveStore>(
    store: &L,
    version: &PlatformVersion,
    plan: &MergePlan,
) -> Result<CommitReport> {
    let mut report = CommitReport::default();

    for &table in TableName::MERGE_ORDER {
        let Some(deltas) = plan.get(&table) else {
            continue;
        };
        let (entries, stats) = batch_entries(table, version, deltas)?;

        if let Err(e) = store.put_batch(table, &entries) {
            tracing::warn!(
                table = table.as_str(),
                cause = %e,
                "Table commit failed, aborting remaining tables"
            );
            report.failed = Some(TableCommitFailure {
                table,
                cause: e.to_string(),
            });
            return Ok(report);
        }

        tracing::info!(
            table = table.as_str(),
            created = stats.created,
            updated = stats.updated,
            "Committed table"
        );
        report.tables.push(stats);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skiff_core::plan_table;
    use skiff_store::SqliteLiveStore;

    fn record(v: serde_json::Value) -> Record {
        v.as_object().unwrap().clone()
    }

    fn running() -> PlatformVersion {
        PlatformVersion::parse("2024.07").unwrap()
    }

    fn plan_for(table: TableName, live: &[Record], snapshot: &[Record]) -> MergePlan {
        let schema = table_schema(table, &running()).unwrap();
        let deltas = plan_table(&schema, live, snapshot).unwrap();
        let mut plan = MergePlan::new();
        plan.insert(table, deltas);
        plan
    }

    #[test]
    fn commits_creates_and_updates() {
        let store = SqliteLiveStore::open_in_memory().unwrap();
        let live = record(json!({"instance_id": "i-1", "state": "stopped"}));
        let keys = table_schema(TableName::Servers, &running()).unwrap().keys;
        store
            .put(TableName::Servers, &record_key(&live, &keys).unwrap(), &live)
            .unwrap();

        let plan = plan_for(
            TableName::Servers,
            &[live],
            &[
                record(json!({"instance_id": "i-1", "state": "running"})),
                record(json!({"instance_id": "i-2", "state": "running"})),
            ],
        );

        let report = commit_plan(&store, &running(), &plan).unwrap();
        assert!(report.failed.is_none());
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].created, 1);
        assert_eq!(report.tables[0].updated, 1);
        assert_eq!(report.records_written(), 2);

        let records = store.scan(TableName::Servers).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["state"], json!("running"));
    }

    #[test]
    fn empty_plan_commits_nothing() {
        let store = SqliteLiveStore::open_in_memory().unwrap();
        let report = commit_plan(&store, &running(), &MergePlan::new()).unwrap();
        assert!(report.tables.is_empty());
        assert_eq!(report.records_written(), 0);
    }

    #[test]
    fn tables_commit_in_merge_order() {
        let store = SqliteLiveStore::open_in_memory().unwrap();
        let mut plan = plan_for(
            TableName::Servers,
            &[],
            &[record(json!({"instance_id": "i-1"}))],
        );
        plan.extend(plan_for(
            TableName::Projects,
            &[],
            &[record(json!({"project_id": "p-1"}))],
        ));

        let report = commit_plan(&store, &running(), &plan).unwrap();
        let order: Vec<TableName> = report.tables.iter().map(|t| t.table).collect();
        assert_eq!(order, vec![TableName::Projects, TableName::Servers]);
    }

    /// Fails every batch write for one table, delegating the rest.
    struct FailOneTable<'a> {
        inner: &'a SqliteLiveStore,
        table: TableName,
    }

    impl LiveStore for FailOneTable<'_> {
        fn get(&self, table: TableName, key: &RecordKey) -> Result<Option<Record>> {
            self.inner.get(table, key)
        }

        fn put(&self, table: TableName, key: &RecordKey, record: &Record) -> Result<()> {
            self.inner.put(table, key, record)
        }

        fn scan(&self, table: TableName) -> Result<Vec<Record>> {
            self.inner.scan(table)
        }

        fn put_batch(&self, table: TableName, entries: &[(RecordKey, Record)]) -> Result<()> {
            if table == self.table {
                return Err(SnapshotError::Persistence {
                    op: "sqlite".to_string(),
                    cause: "database is locked".to_string(),
                });
            }
            self.inner.put_batch(table, entries)
        }
    }

    #[test]
    fn failed_table_is_reported_and_later_tables_are_skipped() {
        let store = SqliteLiveStore::open_in_memory().unwrap();
        let failing = FailOneTable {
            inner: &store,
            table: TableName::Schedules,
        };

        // Merge order: projects, then schedules, then servers.
        let mut plan = plan_for(
            TableName::Projects,
            &[],
            &[record(json!({"project_id": "p-1"}))],
        );
        plan.extend(plan_for(
            TableName::Schedules,
            &[],
            &[record(json!({"schedule_id": "s-1"}))],
        ));
        plan.extend(plan_for(
            TableName::Servers,
            &[],
            &[record(json!({"instance_id": "i-1"}))],
        ));

        let report = commit_plan(&failing, &running(), &plan).unwrap();
        let failure = report.failed.as_ref().unwrap();
        assert_eq!(failure.table, TableName::Schedules);

        // Only the table before the failure committed.
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].table, TableName::Projects);
        assert!(store.scan(TableName::Servers).unwrap().is_empty());

        let err = report.partial_failure().unwrap();
        assert_eq!(err.code(), "ERR_COMMIT_PARTIAL_FAILURE");
    }
}
