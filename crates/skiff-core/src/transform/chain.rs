use crate::errors::{Result, SnapshotError};
use crate::model::{PlatformVersion, Record, TableName};
use std::collections::BTreeMap;

/// The full per-table record mapping a snapshot exports. Steps receive and
/// return the whole mapping, not a single table.
pub type TableData = BTreeMap<TableName, Vec<Record>>;

/// One schema migration step.
///
/// A step transforms data exported at [`Transformation::from_version`]
/// into the shape expected at the next release in the topology. Steps are
/// pure functions over the full mapping: a step either transforms a
/// table's entire record set or passes it through unchanged.
pub trait Transformation: Send + Sync {
    /// Step name, used in logs and in `TransformationFailed`
    fn name(&self) -> &'static str;

    /// The release whose exported shape this step consumes
    fn from_version(&self) -> &PlatformVersion;

    fn transform(&self, tables: TableData) -> Result<TableData>;
}

/// A step for releases with no schema changes. Registering it keeps the
/// topology gap-free so a genuinely missing migration is always detected.
pub struct Passthrough {
    name: &'static str,
    from_version: PlatformVersion,
}

impl Passthrough {
    pub fn new(name: &'static str, from_version: PlatformVersion) -> Self {
        Self { name, from_version }
    }
}

impl Transformation for Passthrough {
    fn name(&self) -> &'static str {
        self.name
    }

    fn from_version(&self) -> &PlatformVersion {
        &self.from_version
    }

    fn transform(&self, tables: TableData) -> Result<TableData> {
        Ok(tables)
    }
}

/// Ordered registry of transformation steps over a release topology.
///
/// The topology is the ascending list of known releases; the last entry is
/// the running environment's version. `apply` folds the steps whose
/// `from_version` lies in `[source, running)` over the table data.
pub struct TransformationChain {
    topology: Vec<PlatformVersion>,
    steps: BTreeMap<PlatformVersion, Box<dyn Transformation>>,
}

impl TransformationChain {
    /// Create a chain over the given release topology. The list is sorted
    /// and deduplicated; it must be non-empty.
    pub fn new(mut topology: Vec<PlatformVersion>) -> Result<Self> {
        if topology.is_empty() {
            return Err(SnapshotError::InvalidSnapshotFormat {
                reason: "version topology must not be empty".to_string(),
            });
        }
        topology.sort();
        topology.dedup();
        Ok(Self {
            topology,
            steps: BTreeMap::new(),
        })
    }

    /// Register a step. Its `from_version` must be a known release older
    /// than the running version, and at most one step may be registered
    /// per release.
    pub fn register(&mut self, step: Box<dyn Transformation>) -> Result<()> {
        let from = step.from_version().clone();
        if !self.topology.contains(&from) {
            return Err(SnapshotError::MissingTransformation {
                version: from.to_string(),
            });
        }
        if &from >= self.running_version() {
            return Err(SnapshotError::InvalidSnapshotFormat {
                reason: format!(
                    "step '{}' transforms from the running version {} or later",
                    step.name(),
                    from
                ),
            });
        }
        if self.steps.contains_key(&from) {
            return Err(SnapshotError::InvalidSnapshotFormat {
                reason: format!("duplicate transformation step for version {}", from),
            });
        }
        self.steps.insert(from, step);
        Ok(())
    }

    /// The running environment's version: the newest release in the
    /// topology.
    pub fn running_version(&self) -> &PlatformVersion {
        self.topology.last().expect("topology is non-empty")
    }

    /// Migrate `tables` from the snapshot's recorded `source` version up
    /// to the running version.
    ///
    /// Identity when `source` equals the running version. Fails with
    /// `MissingTransformation` if `source` is unknown or any release in
    /// the gap has no registered step — a required migration is never
    /// silently skipped. A failing step fails the whole chain; no step is
    /// partially applied.
    pub fn apply(&self, tables: TableData, source: &PlatformVersion) -> Result<TableData> {
        let running = self.running_version();
        if source == running {
            return Ok(tables);
        }
        if source > running {
            return Err(SnapshotError::VersionIncompatible {
                snapshot_version: source.to_string(),
                running_version: running.to_string(),
            });
        }
        if !self.topology.contains(source) {
            return Err(SnapshotError::MissingTransformation {
                version: source.to_string(),
            });
        }

        let mut data = tables;
        for version in self
            .topology
            .iter()
            .filter(|v| *v >= source && *v < running)
        {
            let step = self
                .steps
                .get(version)
                .ok_or_else(|| SnapshotError::MissingTransformation {
                    version: version.to_string(),
                })?;

            tracing::info!(step = step.name(), from_version = %version, "Applying transformation step");
            data = step
                .transform(data)
                .map_err(|e| SnapshotError::TransformationFailed {
                    step: step.name().to_string(),
                    cause: e.to_string(),
                })?;
        }
        Ok(data)
    }
}
