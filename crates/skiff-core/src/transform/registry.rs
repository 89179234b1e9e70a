//! Built-in release topology and transformation steps.
//!
//! The topology is strictly additive: each release gets an entry here, and
//! releases without schema changes register a [`Passthrough`] step so the
//! chain can tell "no change" from "missing migration".

use crate::errors::Result;
use crate::model::{PlatformVersion, Record, TableName};
use crate::transform::chain::{Passthrough, TableData, Transformation, TransformationChain};
use serde_json::{json, Value};

/// Known releases, oldest first. The last entry is the running version.
const VERSION_TOPOLOGY: &[&str] = &["2024.01", "2024.04", "2024.04.02", "2024.07"];

/// The running environment's version.
pub fn running_version() -> PlatformVersion {
    PlatformVersion::parse(VERSION_TOPOLOGY[VERSION_TOPOLOGY.len() - 1])
        .expect("version topology entries must parse")
}

/// Build the chain covering every release in the topology.
pub fn builtin_chain() -> Result<TransformationChain> {
    let versions: Vec<PlatformVersion> = VERSION_TOPOLOGY
        .iter()
        .map(|v| PlatformVersion::parse(v))
        .collect::<Result<_>>()?;

    let mut chain = TransformationChain::new(versions)?;
    chain.register(Box::new(Passthrough::new(
        "passthrough-2024-01",
        PlatformVersion::parse("2024.01")?,
    )))?;
    chain.register(Box::new(ServerStateRename {
        from: PlatformVersion::parse("2024.04")?,
    }))?;
    chain.register(Box::new(RoleAssignmentBackfill {
        from: PlatformVersion::parse("2024.04.02")?,
    }))?;
    Ok(chain)
}

/// 2024.04 exported server records with an `instance_state` field; later
/// releases call it `state`.
struct ServerStateRename {
    from: PlatformVersion,
}

impl Transformation for ServerStateRename {
    fn name(&self) -> &'static str {
        "server-state-rename"
    }

    fn from_version(&self) -> &PlatformVersion {
        &self.from
    }

    fn transform(&self, mut tables: TableData) -> Result<TableData> {
        if let Some(servers) = tables.get_mut(&TableName::Servers) {
            for record in servers {
                if let Some(value) = record.remove("instance_state") {
                    record.insert("state".to_string(), value);
                }
            }
        }
        Ok(tables)
    }
}

/// Project membership moved out of the project record into the
/// role-assignments table after 2024.04.02. Synthesizes one
/// project-member assignment per user and per LDAP group named on each
/// project.
struct RoleAssignmentBackfill {
    from: PlatformVersion,
}

impl RoleAssignmentBackfill {
    fn assignment(actor_id: &str, actor_type: &str, project_id: &str) -> Record {
        json!({
            "actor_key": format!("{}:{}", actor_id, actor_type),
            "resource_key": format!("{}:project", project_id),
            "actor_type": actor_type,
            "actor_id": actor_id,
            "resource_type": "project",
            "resource_id": project_id,
            // Everyone starts at the member role; admins are re-granted
            // through the permission profile tables.
            "role_id": "project_member",
        })
        .as_object()
        .expect("assignment literal is an object")
        .clone()
    }

    fn member_names(project: &Record, field: &str) -> Vec<String> {
        project
            .get(field)
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Transformation for RoleAssignmentBackfill {
    fn name(&self) -> &'static str {
        "role-assignment-backfill"
    }

    fn from_version(&self) -> &PlatformVersion {
        &self.from
    }

    fn transform(&self, mut tables: TableData) -> Result<TableData> {
        let mut assignments: Vec<Record> = Vec::new();

        if let Some(projects) = tables.get(&TableName::Projects) {
            for project in projects {
                let Some(project_id) = project.get("project_id").and_then(Value::as_str) else {
                    continue;
                };
                for user in Self::member_names(project, "users") {
                    assignments.push(Self::assignment(&user, "user", project_id));
                }
                for group in Self::member_names(project, "ldap_groups") {
                    assignments.push(Self::assignment(&group, "group", project_id));
                }
            }
        }

        tracing::debug!(
            count = assignments.len(),
            "Backfilled role assignments from project membership"
        );
        tables.insert(TableName::RoleAssignments, assignments);
        Ok(tables)
    }
}
