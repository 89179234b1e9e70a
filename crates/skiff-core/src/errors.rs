use thiserror::Error;

/// Result type alias using SnapshotError
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Error taxonomy for the snapshot apply pipeline.
///
/// Every variant is terminal for the current invocation: nothing in this
/// taxonomy is retried internally. `CommitPartialFailure` is the only class
/// where some tables may already have been durably mutated; the
/// `CommitReport` returned alongside it names exactly which tables
/// succeeded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// metadata.json or a table artifact is malformed or incomplete
    #[error("Invalid snapshot format: {reason}")]
    InvalidSnapshotFormat { reason: String },

    /// Snapshot bucket or path fails its naming rule
    #[error("Invalid snapshot location: {field} {value:?} does not match {rule}")]
    InvalidSnapshotLocation {
        field: String,
        value: String,
        rule: String,
    },

    /// Snapshot was exported from a newer environment than the running one
    #[error("Snapshot version {snapshot_version} is newer than running version {running_version}")]
    VersionIncompatible {
        snapshot_version: String,
        running_version: String,
    },

    /// No transformation step registered for a version the gap requires
    #[error("No transformation step registered for version {version}")]
    MissingTransformation { version: String },

    /// A transformation step failed; nothing after it was applied
    #[error("Transformation step '{step}' failed: {cause}")]
    TransformationFailed { step: String, cause: String },

    /// Object storage could not serve the snapshot metadata or an artifact
    #[error("Snapshot unreachable at {bucket}/{key}: {cause}")]
    SnapshotUnreachable {
        bucket: String,
        key: String,
        cause: String,
    },

    /// One or more tables failed to commit; earlier tables stay committed
    #[error("Commit failed for table '{table}': {cause}")]
    CommitPartialFailure { table: String, cause: String },

    /// Snapshot ledger entry not found
    #[error("Snapshot not found: {snapshot_id}")]
    SnapshotNotFound { snapshot_id: String },

    /// COMPLETED and FAILED are terminal; a failed apply is retried as a
    /// new invocation, never resumed in place
    #[error("Invalid snapshot status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// Live store or ledger operation failed
    #[error("Persistence failure in {op}: {cause}")]
    Persistence { op: String, cause: String },

    /// JSON encode/decode failure outside snapshot parsing
    #[error("Serialization failure in {op}: {cause}")]
    Serialization { op: String, cause: String },
}

impl SnapshotError {
    /// Get the stable error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotError::InvalidSnapshotFormat { .. } => "ERR_INVALID_SNAPSHOT_FORMAT",
            SnapshotError::InvalidSnapshotLocation { .. } => "ERR_INVALID_SNAPSHOT_LOCATION",
            SnapshotError::VersionIncompatible { .. } => "ERR_VERSION_INCOMPATIBLE",
            SnapshotError::MissingTransformation { .. } => "ERR_MISSING_TRANSFORMATION",
            SnapshotError::TransformationFailed { .. } => "ERR_TRANSFORMATION_FAILED",
            SnapshotError::SnapshotUnreachable { .. } => "ERR_SNAPSHOT_UNREACHABLE",
            SnapshotError::CommitPartialFailure { .. } => "ERR_COMMIT_PARTIAL_FAILURE",
            SnapshotError::SnapshotNotFound { .. } => "ERR_SNAPSHOT_NOT_FOUND",
            SnapshotError::InvalidStatusTransition { .. } => "ERR_INVALID_STATUS_TRANSITION",
            SnapshotError::Persistence { .. } => "ERR_PERSISTENCE",
            SnapshotError::Serialization { .. } => "ERR_SERIALIZATION",
        }
    }
}
