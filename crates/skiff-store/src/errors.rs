//! Error helpers for skiff-store
//!
//! Wraps skiff-core's SnapshotError with store-specific constructors

use skiff_core::errors::SnapshotError;

/// Result type alias using SnapshotError
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Create a persistence error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> SnapshotError {
    SnapshotError::Persistence {
        op: "sqlite".to_string(),
        cause: err.to_string(),
    }
}

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> SnapshotError {
    SnapshotError::Persistence {
        op: "migration".to_string(),
        cause: format!("Migration {} failed: {}", migration_id, reason),
    }
}

/// Create an object-storage error surfaced as SnapshotUnreachable
pub fn unreachable(bucket: &str, key: &str, err: std::io::Error) -> SnapshotError {
    SnapshotError::SnapshotUnreachable {
        bucket: bucket.to_string(),
        key: key.to_string(),
        cause: err.to_string(),
    }
}

/// Create a serialization error for record encode/decode
pub fn record_codec(op: &str, err: serde_json::Error) -> SnapshotError {
    SnapshotError::Serialization {
        op: op.to_string(),
        cause: err.to_string(),
    }
}
