use serde::{Deserialize, Serialize};
use std::fmt;

/// Control-plane tables that participate in snapshot export and apply.
///
/// The wire name (used in metadata.json and as the storage table name) is
/// the serde rename value; `as_str` returns the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TableName {
    #[serde(rename = "accounts.users")]
    Users,
    #[serde(rename = "accounts.groups")]
    Groups,
    #[serde(rename = "projects")]
    Projects,
    #[serde(rename = "schedules")]
    Schedules,
    #[serde(rename = "servers")]
    Servers,
    #[serde(rename = "software-stacks")]
    SoftwareStacks,
    #[serde(rename = "permission-profiles")]
    PermissionProfiles,
    #[serde(rename = "role-assignments")]
    RoleAssignments,
    #[serde(rename = "cluster-settings")]
    ClusterSettings,
}

impl TableName {
    /// All tables, in merge dependency order: a table appears after every
    /// table its records reference (role assignments reference users,
    /// groups, and projects; software stacks reference projects).
    pub const MERGE_ORDER: &'static [TableName] = &[
        TableName::Users,
        TableName::Groups,
        TableName::PermissionProfiles,
        TableName::Projects,
        TableName::RoleAssignments,
        TableName::Schedules,
        TableName::Servers,
        TableName::SoftwareStacks,
        TableName::ClusterSettings,
    ];

    /// The wire/storage name of this table
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Users => "accounts.users",
            TableName::Groups => "accounts.groups",
            TableName::Projects => "projects",
            TableName::Schedules => "schedules",
            TableName::Servers => "servers",
            TableName::SoftwareStacks => "software-stacks",
            TableName::PermissionProfiles => "permission-profiles",
            TableName::RoleAssignments => "role-assignments",
            TableName::ClusterSettings => "cluster-settings",
        }
    }

    /// Look up a table by its wire name. Unknown names return `None`;
    /// snapshots may contain tables this build does not merge, and those
    /// are skipped rather than rejected.
    pub fn from_wire(name: &str) -> Option<TableName> {
        TableName::MERGE_ORDER
            .iter()
            .copied()
            .find(|t| t.as_str() == name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary key shape of a table: a hash (partition) key and an optional
/// range (sort) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableKeys {
    pub partition_key: &'static str,
    pub sort_key: Option<&'static str>,
}
