//! Per-table key shapes and protected fields, versioned by release.
//!
//! The key registry is strictly additive: a table gets one entry at the
//! release that introduced it, and a further entry only at a release that
//! changed its keys. Lookups for a version with no exact entry fall back
//! to the most recent earlier entry. Table deletions never remove entries;
//! old snapshots must stay readable.

use crate::errors::{Result, SnapshotError};
use crate::model::{PlatformVersion, TableKeys, TableName};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Schema a table merges under: its key shape plus the fields that must
/// never be overwritten by snapshot content.
///
/// Protected fields hold externally-provisioned, non-reconstructable
/// state (cloud resource handles, hardware facts); they must reflect
/// present reality, not the snapshot's historical view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub table: TableName,
    pub keys: TableKeys,
    pub protected_fields: &'static [&'static str],
}

type KeyHistory = Vec<(&'static str, TableKeys)>;

static TABLE_KEY_HISTORY: LazyLock<BTreeMap<TableName, KeyHistory>> = LazyLock::new(|| {
    let single = |field: &'static str| TableKeys {
        partition_key: field,
        sort_key: None,
    };
    let mut map = BTreeMap::new();
    map.insert(TableName::Users, vec![("2024.01", single("username"))]);
    map.insert(TableName::Groups, vec![("2024.01", single("group_name"))]);
    map.insert(TableName::Projects, vec![("2024.01", single("project_id"))]);
    map.insert(TableName::Schedules, vec![("2024.01", single("schedule_id"))]);
    map.insert(TableName::Servers, vec![("2024.01", single("instance_id"))]);
    map.insert(
        TableName::SoftwareStacks,
        vec![(
            "2024.01",
            TableKeys {
                partition_key: "base_os",
                sort_key: Some("stack_id"),
            },
        )],
    );
    map.insert(
        TableName::PermissionProfiles,
        vec![("2024.01", single("profile_id"))],
    );
    map.insert(
        TableName::RoleAssignments,
        // Introduced with the 2024.04.02 membership migration.
        vec![(
            "2024.04.02",
            TableKeys {
                partition_key: "actor_key",
                sort_key: Some("resource_key"),
            },
        )],
    );
    map.insert(TableName::ClusterSettings, vec![("2024.01", single("key"))]);
    map
});

fn protected_fields(table: TableName) -> &'static [&'static str] {
    match table {
        // Provisioned EC2 facts; a restore must not resurrect stale handles.
        TableName::Servers => &["instance_arn", "private_ip"],
        // The registered image is region- and account-local.
        TableName::SoftwareStacks => &["ami_id"],
        _ => &[],
    }
}

/// Key shape of `table` as of `version`, with fallback to the most recent
/// earlier release. Fails if the table did not exist at that version.
pub fn table_keys(table: TableName, version: &PlatformVersion) -> Result<TableKeys> {
    let history = TABLE_KEY_HISTORY
        .get(&table)
        .expect("every table has a key history entry");

    let mut best: Option<TableKeys> = None;
    for (entry_version, keys) in history {
        let entry_version = PlatformVersion::parse(entry_version)?;
        if &entry_version <= version {
            best = Some(*keys);
        }
    }

    best.ok_or_else(|| SnapshotError::InvalidSnapshotFormat {
        reason: format!("table {} does not exist at version {}", table, version),
    })
}

/// Full merge schema of `table` as of `version`.
pub fn table_schema(table: TableName, version: &PlatformVersion) -> Result<TableSchema> {
    Ok(TableSchema {
        table,
        keys: table_keys(table, version)?,
        protected_fields: protected_fields(table),
    })
}
