//! Snapshot metadata validation.
//!
//! Parses and validates a snapshot's `metadata.json` and its storage
//! coordinates before anything else in the pipeline runs. Pure validation:
//! no side effects, and every check here happens before any mutation of
//! the live environment.

use crate::errors::{Result, SnapshotError};
use crate::model::{PlatformVersion, Record};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Name of the metadata object under the snapshot path
pub const METADATA_OBJECT_NAME: &str = "metadata.json";

const VERSION_KEY: &str = "version";
const TABLE_EXPORT_DESCRIPTIONS_KEY: &str = "table_export_descriptions";

const BUCKET_NAME_RULE: &str = r"^[a-z0-9]+[.\-\w]*[a-z0-9]+$";
const SNAPSHOT_PATH_RULE: &str = r"^([\w.\-!*'()]+[/]*)+$";

static BUCKET_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(BUCKET_NAME_RULE).expect("bucket name rule must compile"));
static SNAPSHOT_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SNAPSHOT_PATH_RULE).expect("snapshot path rule must compile"));

/// Per-table export description from metadata.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableExportDescription {
    /// Object key of the exported records artifact, relative to the bucket
    pub export_key: String,
    /// Number of records the export wrote for this table
    pub record_count: u64,
    /// Optional hex SHA-256 of the artifact bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Validated snapshot metadata: the recorded source version plus one
/// export description per exported table, keyed by wire table name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub version: PlatformVersion,
    pub table_export_descriptions: BTreeMap<String, TableExportDescription>,
}

/// Validate a snapshot's storage coordinates against the platform naming
/// rules.
pub fn validate_location(bucket: &str, path: &str) -> Result<()> {
    if bucket.trim().is_empty() || !BUCKET_NAME_RE.is_match(bucket) {
        return Err(SnapshotError::InvalidSnapshotLocation {
            field: "bucket".to_string(),
            value: bucket.to_string(),
            rule: BUCKET_NAME_RULE.to_string(),
        });
    }
    if path.trim().is_empty() || !SNAPSHOT_PATH_RE.is_match(path) {
        return Err(SnapshotError::InvalidSnapshotLocation {
            field: "path".to_string(),
            value: path.to_string(),
            rule: SNAPSHOT_PATH_RULE.to_string(),
        });
    }
    Ok(())
}

/// Parse raw `metadata.json` bytes into a validated [`SnapshotMetadata`].
///
/// Staged: UTF-8 decode, generic JSON parse, required-key checks, then
/// typed deserialization. The recorded version must not be newer than the
/// running environment's version; forward-apply is a hard stop.
///
/// # Errors
///
/// - `InvalidSnapshotFormat` — not UTF-8, not JSON, missing `version` or
///   `table_export_descriptions`, or wrongly typed fields
/// - `VersionIncompatible` — recorded version is newer than `running`
pub fn parse_metadata_bytes(bytes: &[u8], running: &PlatformVersion) -> Result<SnapshotMetadata> {
    let text =
        std::str::from_utf8(bytes).map_err(|e| SnapshotError::InvalidSnapshotFormat {
            reason: format!("metadata is not valid UTF-8: {}", e),
        })?;

    let raw: serde_json::Value =
        serde_json::from_str(text).map_err(|e| SnapshotError::InvalidSnapshotFormat {
            reason: format!("metadata is not valid JSON: {}", e),
        })?;

    let obj = raw
        .as_object()
        .ok_or_else(|| SnapshotError::InvalidSnapshotFormat {
            reason: "metadata JSON root must be an object".to_string(),
        })?;

    if !obj.contains_key(VERSION_KEY) {
        return Err(SnapshotError::InvalidSnapshotFormat {
            reason: format!("required field `{}` is absent", VERSION_KEY),
        });
    }
    if !obj.contains_key(TABLE_EXPORT_DESCRIPTIONS_KEY) {
        return Err(SnapshotError::InvalidSnapshotFormat {
            reason: format!("required field `{}` is absent", TABLE_EXPORT_DESCRIPTIONS_KEY),
        });
    }

    let metadata: SnapshotMetadata =
        serde_json::from_value(raw).map_err(|e| SnapshotError::InvalidSnapshotFormat {
            reason: format!("failed to deserialize metadata: {}", e),
        })?;

    if &metadata.version > running {
        return Err(SnapshotError::VersionIncompatible {
            snapshot_version: metadata.version.to_string(),
            running_version: running.to_string(),
        });
    }

    tracing::debug!(
        version = %metadata.version,
        tables = metadata.table_export_descriptions.len(),
        "Parsed snapshot metadata"
    );

    Ok(metadata)
}

/// Parse a table's exported-records artifact and verify it against its
/// export description.
///
/// Truncated or tampered exports are detected here, before any merge
/// planning: the record count must match, and when the description carries
/// a checksum the artifact bytes must hash to it.
pub fn verify_table_artifact(
    table: &str,
    description: &TableExportDescription,
    bytes: &[u8],
) -> Result<Vec<Record>> {
    if let Some(expected) = &description.sha256 {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let actual = hex::encode(hasher.finalize());
        if &actual != expected {
            return Err(SnapshotError::InvalidSnapshotFormat {
                reason: format!(
                    "artifact checksum mismatch for table {:?}: expected {}, got {}",
                    table, expected, actual
                ),
            });
        }
    }

    let records: Vec<Record> =
        serde_json::from_slice(bytes).map_err(|e| SnapshotError::InvalidSnapshotFormat {
            reason: format!("artifact for table {:?} is not a JSON record array: {}", table, e),
        })?;

    if records.len() as u64 != description.record_count {
        return Err(SnapshotError::InvalidSnapshotFormat {
            reason: format!(
                "artifact for table {:?} has {} records, export description says {}",
                table,
                records.len(),
                description.record_count
            ),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running() -> PlatformVersion {
        PlatformVersion::parse("2024.07").unwrap()
    }

    fn valid_metadata_json() -> String {
        r#"{
            "version": "2024.04",
            "table_export_descriptions": {
                "servers": {
                    "export_key": "exports/nightly/servers/records.json",
                    "record_count": 2
                }
            }
        }"#
        .to_string()
    }

    #[test]
    fn accepts_valid_locations() {
        validate_location("cluster-snapshots", "exports/nightly").unwrap();
        validate_location("a1.b-2", "a/b/c.d-e!f").unwrap();
    }

    #[test]
    fn rejects_bad_bucket_names() {
        for bucket in ["", "A", "-leading", "UPPER.case", "ends-"] {
            let err = validate_location(bucket, "exports/nightly").unwrap_err();
            assert_eq!(err.code(), "ERR_INVALID_SNAPSHOT_LOCATION");
        }
    }

    #[test]
    fn rejects_bad_paths() {
        for path in ["", "bad path", "semi;colon"] {
            let err = validate_location("cluster-snapshots", path).unwrap_err();
            assert_eq!(err.code(), "ERR_INVALID_SNAPSHOT_LOCATION");
        }
    }

    #[test]
    fn parses_valid_metadata() {
        let meta = parse_metadata_bytes(valid_metadata_json().as_bytes(), &running()).unwrap();
        assert_eq!(meta.version, PlatformVersion::parse("2024.04").unwrap());
        assert_eq!(meta.table_export_descriptions.len(), 1);
        let desc = &meta.table_export_descriptions["servers"];
        assert_eq!(desc.record_count, 2);
        assert!(desc.sha256.is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = parse_metadata_bytes(b"{not json", &running()).unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_SNAPSHOT_FORMAT");

        let err = parse_metadata_bytes(&[0xff, 0xfe], &running()).unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_SNAPSHOT_FORMAT");
    }

    #[test]
    fn rejects_missing_required_keys() {
        let err = parse_metadata_bytes(br#"{"version": "2024.04"}"#, &running()).unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_SNAPSHOT_FORMAT");

        let err =
            parse_metadata_bytes(br#"{"table_export_descriptions": {}}"#, &running()).unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_SNAPSHOT_FORMAT");
    }

    #[test]
    fn rejects_newer_snapshot_version() {
        let json = valid_metadata_json().replace("2024.04", "2024.09");
        let err = parse_metadata_bytes(json.as_bytes(), &running()).unwrap_err();
        assert_eq!(err.code(), "ERR_VERSION_INCOMPATIBLE");
    }

    #[test]
    fn equal_version_is_compatible() {
        let json = valid_metadata_json().replace("2024.04", "2024.07");
        assert!(parse_metadata_bytes(json.as_bytes(), &running()).is_ok());
    }

    #[test]
    fn verifies_artifact_count_and_checksum() {
        let bytes = br#"[{"instance_id": "i-1"}, {"instance_id": "i-2"}]"#;
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let sum = hex::encode(hasher.finalize());

        let desc = TableExportDescription {
            export_key: "exports/servers/records.json".to_string(),
            record_count: 2,
            sha256: Some(sum),
        };
        let records = verify_table_artifact("servers", &desc, bytes).unwrap();
        assert_eq!(records.len(), 2);

        let truncated = TableExportDescription {
            record_count: 3,
            ..desc.clone()
        };
        let err = verify_table_artifact("servers", &truncated, bytes).unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_SNAPSHOT_FORMAT");

        let tampered = TableExportDescription {
            sha256: Some("0".repeat(64)),
            ..desc
        };
        let err = verify_table_artifact("servers", &tampered, bytes).unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_SNAPSHOT_FORMAT");
    }
}
