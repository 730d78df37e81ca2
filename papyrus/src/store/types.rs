use crate::record::{Record, RecordSet, SortDirection};
use serde_json::Value;

/// Single equality test. The engine only evaluates it against the primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Everything a fetch can be asked for besides the target file.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Projection; empty means whole records
    pub fields: Vec<String>,
    pub condition: Option<Condition>,
    /// Ignored for keyed fetches
    pub sort: Option<Sort>,
    /// Maximum number of records after sorting; 0 means no limit
    pub limit: usize,
}

/// Result of a fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Keyed fetch: the matching record, if any
    One(Option<Record>),
    /// Unkeyed fetch: sorted, limited and projected records
    Many(RecordSet),
}

impl Fetched {
    pub fn records(&self) -> &[Record] {
        match self {
            Fetched::One(Some(record)) => std::slice::from_ref(record),
            Fetched::One(None) => &[],
            Fetched::Many(records) => records,
        }
    }

    pub fn into_records(self) -> RecordSet {
        match self {
            Fetched::One(record) => record.into_iter().collect(),
            Fetched::Many(records) => records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The record as appended, keys assigned and fields in schema order
    Inserted(Record),
    /// A record with this unique key already exists; nothing was written
    DuplicateKey(Value),
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Number of records the payload was merged into
    pub matched: usize,
    /// Whether the file was rewritten
    pub written: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Keyed delete removed this many records (0 or 1)
    Removed(usize),
    /// Unkeyed delete emptied the file
    Truncated,
}
