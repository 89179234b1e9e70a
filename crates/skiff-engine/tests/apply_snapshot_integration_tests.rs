//! End-to-end apply tests over a filesystem object store and an
//! in-memory SQLite live store.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use skiff_core::{Record, RecordKey, SnapshotStatus, TableName};
use skiff_engine::SnapshotLifecycleController;
use skiff_store::{FsObjectStore, LiveStore, SqliteLiveStore};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const BUCKET: &str = "cluster-exports";
const SNAPSHOT_PATH: &str = "exports/nightly";

fn record(v: Value) -> Record {
    v.as_object().unwrap().clone()
}

fn key(hash: &str) -> RecordKey {
    RecordKey {
        hash: hash.to_string(),
        range: None,
    }
}

/// Lay out a snapshot export under `root/BUCKET/SNAPSHOT_PATH`: one
/// records artifact per table plus a metadata.json describing them.
fn write_export(root: &Path, version: &str, tables: &[(&str, Value)]) {
    let base = root.join(BUCKET).join(SNAPSHOT_PATH);
    let mut descriptions = serde_json::Map::new();

    for (table, records) in tables {
        let bytes = serde_json::to_vec(records).unwrap();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let sum = hex::encode(hasher.finalize());

        let table_dir = base.join(table);
        fs::create_dir_all(&table_dir).unwrap();
        fs::write(table_dir.join("records.json"), &bytes).unwrap();

        descriptions.insert(
            table.to_string(),
            json!({
                "export_key": format!("{SNAPSHOT_PATH}/{table}/records.json"),
                "record_count": records.as_array().unwrap().len(),
                "sha256": sum,
            }),
        );
    }

    fs::create_dir_all(&base).unwrap();
    let metadata = json!({
        "version": version,
        "table_export_descriptions": descriptions,
    });
    fs::write(
        base.join("metadata.json"),
        serde_json::to_vec_pretty(&metadata).unwrap(),
    )
    .unwrap();
}

fn setup() -> (TempDir, FsObjectStore, SqliteLiveStore) {
    let dir = TempDir::new().unwrap();
    let objects = FsObjectStore::new(dir.path());
    let store = SqliteLiveStore::open_in_memory().unwrap();
    (dir, objects, store)
}

#[test]
fn apply_creates_records_and_completes() {
    let (dir, objects, store) = setup();
    write_export(
        dir.path(),
        "2024.07",
        &[
            (
                "servers",
                json!([{"instance_id": "i-1", "state": "running"}]),
            ),
            (
                "projects",
                json!([{"project_id": "p-1", "name": "chemistry"}]),
            ),
        ],
    );

    let controller = SnapshotLifecycleController::new(&objects, &store, &store);
    let report = controller.apply_snapshot(BUCKET, SNAPSHOT_PATH).unwrap();

    assert_eq!(report.snapshot.status, SnapshotStatus::Completed);
    assert_eq!(report.commit.records_written(), 2);

    assert_eq!(store.scan(TableName::Servers).unwrap().len(), 1);
    assert_eq!(store.scan(TableName::Projects).unwrap().len(), 1);

    let ledger = controller.list_snapshots().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].status, SnapshotStatus::Completed);
    assert_eq!(ledger[0].bucket, BUCKET);
}

#[test]
fn reapplying_the_same_snapshot_is_idempotent() {
    let (dir, objects, store) = setup();
    write_export(
        dir.path(),
        "2024.07",
        &[(
            "servers",
            json!([
                {"instance_id": "i-1", "state": "running"},
                {"instance_id": "i-2", "state": "stopped"}
            ]),
        )],
    );

    let controller = SnapshotLifecycleController::new(&objects, &store, &store);
    controller.apply_snapshot(BUCKET, SNAPSHOT_PATH).unwrap();
    let after_first = store.scan(TableName::Servers).unwrap();

    controller.apply_snapshot(BUCKET, SNAPSHOT_PATH).unwrap();
    let after_second = store.scan(TableName::Servers).unwrap();

    assert_eq!(after_first, after_second);

    // Each invocation is its own ledger entry, both terminal.
    let ledger = controller.list_snapshots().unwrap();
    assert_eq!(ledger.len(), 2);
    assert!(ledger
        .iter()
        .all(|s| s.status == SnapshotStatus::Completed));
}

#[test]
fn protected_fields_keep_the_live_value() {
    let (dir, objects, store) = setup();
    store
        .put(
            TableName::Servers,
            &key("i-1"),
            &record(json!({
                "instance_id": "i-1",
                "state": "stopped",
                "instance_arn": "arn:aws:ec2:us-east-1:111:instance/i-1",
                "private_ip": "10.0.0.7"
            })),
        )
        .unwrap();

    write_export(
        dir.path(),
        "2024.07",
        &[(
            "servers",
            json!([{
                "instance_id": "i-1",
                "state": "running",
                "instance_arn": "arn:aws:ec2:eu-west-1:999:instance/i-1"
            }]),
        )],
    );

    let controller = SnapshotLifecycleController::new(&objects, &store, &store);
    controller.apply_snapshot(BUCKET, SNAPSHOT_PATH).unwrap();

    let merged = store.get(TableName::Servers, &key("i-1")).unwrap().unwrap();
    assert_eq!(merged["state"], json!("running"));
    assert_eq!(
        merged["instance_arn"],
        json!("arn:aws:ec2:us-east-1:111:instance/i-1")
    );
    assert_eq!(merged["private_ip"], json!("10.0.0.7"));
}

#[test]
fn live_only_records_are_not_deleted() {
    let (dir, objects, store) = setup();
    store
        .put(
            TableName::Servers,
            &key("i-local"),
            &record(json!({"instance_id": "i-local", "state": "running"})),
        )
        .unwrap();

    write_export(
        dir.path(),
        "2024.07",
        &[(
            "servers",
            json!([{"instance_id": "i-snap", "state": "running"}]),
        )],
    );

    let controller = SnapshotLifecycleController::new(&objects, &store, &store);
    controller.apply_snapshot(BUCKET, SNAPSHOT_PATH).unwrap();

    let records = store.scan(TableName::Servers).unwrap();
    assert_eq!(records.len(), 2);
    assert!(store
        .get(TableName::Servers, &key("i-local"))
        .unwrap()
        .is_some());
}

#[test]
fn old_exports_are_transformed_before_merging() {
    let (dir, objects, store) = setup();
    // 2024.01 exports still carry `instance_state` and keep project
    // membership inline on the project record.
    write_export(
        dir.path(),
        "2024.01",
        &[
            (
                "servers",
                json!([{"instance_id": "i-1", "instance_state": "stopped"}]),
            ),
            (
                "projects",
                json!([{
                    "project_id": "p-1",
                    "users": ["alice"],
                    "ldap_groups": ["hpc-admins"]
                }]),
            ),
        ],
    );

    let controller = SnapshotLifecycleController::new(&objects, &store, &store);
    controller.apply_snapshot(BUCKET, SNAPSHOT_PATH).unwrap();

    let server = store.get(TableName::Servers, &key("i-1")).unwrap().unwrap();
    assert_eq!(server["state"], json!("stopped"));
    assert!(server.get("instance_state").is_none());

    let assignments = store.scan(TableName::RoleAssignments).unwrap();
    assert_eq!(assignments.len(), 2);
    assert!(assignments
        .iter()
        .any(|a| a["actor_key"] == json!("alice:user")));
    assert!(assignments
        .iter()
        .any(|a| a["actor_key"] == json!("hpc-admins:group")));
}

#[test]
fn unrecognized_table_exports_are_skipped() {
    let (dir, objects, store) = setup();
    write_export(
        dir.path(),
        "2024.07",
        &[
            (
                "servers",
                json!([{"instance_id": "i-1", "state": "running"}]),
            ),
            ("telemetry-streams", json!([{"stream_id": "t-1"}])),
        ],
    );

    let controller = SnapshotLifecycleController::new(&objects, &store, &store);
    let report = controller.apply_snapshot(BUCKET, SNAPSHOT_PATH).unwrap();

    assert_eq!(report.snapshot.status, SnapshotStatus::Completed);
    assert_eq!(report.commit.records_written(), 1);
}
