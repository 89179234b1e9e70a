use crate::model::Record;
use serde::{Deserialize, Serialize};

/// The action the committer performs for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeAction {
    Create,
    Update,
    /// Not produced by the default merge policy; reserved for an explicit
    /// opt-in destroy-and-recreate mode.
    Delete,
}

impl MergeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeAction::Create => "CREATE",
            MergeAction::Update => "UPDATE",
            MergeAction::Delete => "DELETE",
        }
    }
}

/// The computed outcome for one (table, primary key) pair.
///
/// Constructors enforce the presence invariant: CREATE iff there is no
/// original record, DELETE iff there is no resolved record, UPDATE
/// otherwise. Fields are read through accessors so the invariant cannot
/// be broken after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecordDelta {
    original_record: Option<Record>,
    snapshot_record: Record,
    resolved_record: Option<Record>,
    action: MergeAction,
}

impl MergedRecordDelta {
    /// Key absent live: the snapshot record is created verbatim.
    pub fn create(snapshot_record: Record) -> Self {
        Self {
            original_record: None,
            resolved_record: Some(snapshot_record.clone()),
            snapshot_record,
            action: MergeAction::Create,
        }
    }

    /// Key present on both sides: `resolved_record` is the field-merge of
    /// snapshot content over the live record.
    pub fn update(original_record: Record, snapshot_record: Record, resolved_record: Record) -> Self {
        Self {
            original_record: Some(original_record),
            resolved_record: Some(resolved_record),
            snapshot_record,
            action: MergeAction::Update,
        }
    }

    /// Explicit removal. No default code path produces this; it exists so
    /// the action space is total for a future destroy-and-recreate mode.
    pub fn delete(original_record: Record, snapshot_record: Record) -> Self {
        Self {
            original_record: Some(original_record),
            resolved_record: None,
            snapshot_record,
            action: MergeAction::Delete,
        }
    }

    pub fn action(&self) -> MergeAction {
        self.action
    }

    pub fn original_record(&self) -> Option<&Record> {
        self.original_record.as_ref()
    }

    pub fn snapshot_record(&self) -> &Record {
        &self.snapshot_record
    }

    pub fn resolved_record(&self) -> Option<&Record> {
        self.resolved_record.as_ref()
    }
}
