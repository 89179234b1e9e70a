use crate::errors::{Result, SnapshotError};
use crate::model::table::TableKeys;
use serde_json::Value;

/// One table row, as exported and as stored: a flat JSON object.
pub type Record = serde_json::Map<String, Value>;

/// The primary key extracted from a record, normalized to strings so it
/// can index both live and snapshot record sets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub hash: String,
    pub range: Option<String>,
}

impl RecordKey {
    /// Render the key for logs and commit reports
    pub fn display(&self) -> String {
        match &self.range {
            Some(range) => format!("{}/{}", self.hash, range),
            None => self.hash.clone(),
        }
    }
}

fn key_field_to_string(record: &Record, field: &str) -> Result<String> {
    let value = record
        .get(field)
        .ok_or_else(|| SnapshotError::InvalidSnapshotFormat {
            reason: format!("record is missing key field {:?}", field),
        })?;
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(SnapshotError::InvalidSnapshotFormat {
            reason: format!("key field {:?} has non-scalar value: {}", field, other),
        }),
    }
}

/// Extract a record's primary key according to the table's key shape.
pub fn record_key(record: &Record, keys: &TableKeys) -> Result<RecordKey> {
    let hash = key_field_to_string(record, keys.partition_key)?;
    let range = match keys.sort_key {
        Some(sort_key) => Some(key_field_to_string(record, sort_key)?),
        None => None,
    };
    Ok(RecordKey { hash, range })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn extracts_hash_only_key() {
        let keys = TableKeys {
            partition_key: "instance_id",
            sort_key: None,
        };
        let rec = record(json!({"instance_id": "i-1", "state": "running"}));
        let key = record_key(&rec, &keys).unwrap();
        assert_eq!(key.hash, "i-1");
        assert_eq!(key.range, None);
        assert_eq!(key.display(), "i-1");
    }

    #[test]
    fn extracts_hash_and_range_key() {
        let keys = TableKeys {
            partition_key: "base_os",
            sort_key: Some("stack_id"),
        };
        let rec = record(json!({"base_os": "amazonlinux2", "stack_id": "stack-7"}));
        let key = record_key(&rec, &keys).unwrap();
        assert_eq!(key.display(), "amazonlinux2/stack-7");
    }

    #[test]
    fn numeric_keys_normalize_to_strings() {
        let keys = TableKeys {
            partition_key: "schedule_id",
            sort_key: None,
        };
        let rec = record(json!({"schedule_id": 42}));
        assert_eq!(record_key(&rec, &keys).unwrap().hash, "42");
    }

    #[test]
    fn missing_or_non_scalar_key_fields_are_rejected() {
        let keys = TableKeys {
            partition_key: "project_id",
            sort_key: None,
        };
        let rec = record(json!({"name": "apollo"}));
        assert!(record_key(&rec, &keys).is_err());

        let rec = record(json!({"project_id": ["not", "scalar"]}));
        assert!(record_key(&rec, &keys).is_err());
    }
}
