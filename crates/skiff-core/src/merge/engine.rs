//! Merge plan computation.
//!
//! The planner is a total function over the presence matrix of each key:
//! snapshot-only keys become CREATE, keys on both sides become UPDATE
//! (always emitted, even when the resolved record equals the live one, so
//! idempotent re-apply is observable), and live-only keys produce no delta
//! at all. Output order is deterministic for fixed inputs.

use crate::errors::Result;
use crate::merge::delta::MergedRecordDelta;
use crate::merge::schema::TableSchema;
use crate::model::{record_key, Record, RecordKey};
use std::collections::BTreeMap;

/// Resolve the final record for a key present on both sides: snapshot
/// content wins everywhere except the table's protected fields, which
/// keep the live record's value (including absence).
fn resolve_update(schema: &TableSchema, original: &Record, snapshot: &Record) -> Record {
    let mut resolved = snapshot.clone();
    for field in schema.protected_fields {
        match original.get(*field) {
            Some(value) => {
                resolved.insert((*field).to_string(), value.clone());
            }
            None => {
                resolved.remove(*field);
            }
        }
    }
    resolved
}

/// Compute the merge plan for one table.
///
/// Both record sets are indexed by primary key; duplicate keys within a
/// set keep the last occurrence. Deltas come out in key order.
pub fn plan_table(
    schema: &TableSchema,
    live_records: &[Record],
    snapshot_records: &[Record],
) -> Result<Vec<MergedRecordDelta>> {
    let mut live_by_key: BTreeMap<RecordKey, &Record> = BTreeMap::new();
    for record in live_records {
        live_by_key.insert(record_key(record, &schema.keys)?, record);
    }

    let mut snapshot_by_key: BTreeMap<RecordKey, &Record> = BTreeMap::new();
    for record in snapshot_records {
        snapshot_by_key.insert(record_key(record, &schema.keys)?, record);
    }

    let mut deltas = Vec::with_capacity(snapshot_by_key.len());
    for (key, snapshot_record) in &snapshot_by_key {
        match live_by_key.get(key) {
            None => {
                tracing::debug!(table = %schema.table, key = %key.display(), "planned CREATE");
                deltas.push(MergedRecordDelta::create((*snapshot_record).clone()));
            }
            Some(original) => {
                let resolved = resolve_update(schema, original, snapshot_record);
                tracing::debug!(table = %schema.table, key = %key.display(), "planned UPDATE");
                deltas.push(MergedRecordDelta::update(
                    (*original).clone(),
                    (*snapshot_record).clone(),
                    resolved,
                ));
            }
        }
    }
    // Live-only keys: no delta. Deletion-on-absence would destroy state
    // created after the snapshot was taken.

    Ok(deltas)
}
