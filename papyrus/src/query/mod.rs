//! Fluent query builder.
//!
//! Builder calls only accumulate intent; `execute` hands it to the engine.
//! A call with invalid input leaves the intent untouched and is remembered:
//! the first such rejection is what every later `execute` returns, before any
//! I/O. A rejected builder never runs; start a new one from `Store::query`.

use crate::error::{PapyrusError, Result};
use crate::record::{self, Record, RecordSet};
use crate::store::{
    Condition, DeleteOutcome, FetchOptions, Fetched, InsertOutcome, Sort, Store, UpdateOutcome,
};
use serde_json::Value;

/// Operation implied by the source-selection call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Insert,
    Update,
    Delete,
}

/// Accumulated query intent against one store.
pub struct Query<'a> {
    store: &'a Store,
    source: Option<(String, Operation)>,
    fields: Vec<String>,
    payload: Record,
    condition: Option<Condition>,
    sort: Option<Sort>,
    limit: usize,
    rejected: Option<PapyrusError>,
}

impl<'a> Query<'a> {
    pub fn new(store: &'a Store) -> Self {
        Query {
            store,
            source: None,
            fields: Vec::new(),
            payload: Record::new(),
            condition: None,
            sort: None,
            limit: 0,
            rejected: None,
        }
    }

    fn reject(&mut self, err: PapyrusError) {
        log::warn!("Query call rejected: {err}");
        if self.rejected.is_none() {
            self.rejected = Some(err);
        }
    }

    /// Replace the projection. Names are trimmed; blank entries are dropped.
    pub fn select<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fields = fields
            .into_iter()
            .map(|f| f.as_ref().trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        self
    }

    /// Read from `file`.
    pub fn from(&mut self, file: &str) -> &mut Self {
        self.choose_source(file, Operation::Fetch)
    }

    /// Insert into `file`.
    pub fn insert_into(&mut self, file: &str) -> &mut Self {
        self.choose_source(file, Operation::Insert)
    }

    /// Update records of `file`.
    pub fn update(&mut self, file: &str) -> &mut Self {
        self.choose_source(file, Operation::Update)
    }

    /// Delete records of `file`.
    pub fn delete_from(&mut self, file: &str) -> &mut Self {
        self.choose_source(file, Operation::Delete)
    }

    /// Set target and operation, provided the file is registered and present on disk.
    fn choose_source(&mut self, file: &str, operation: Operation) -> &mut Self {
        let file: String = file.chars().filter(|c| !c.is_whitespace()).collect();
        if !self.store.schema().contains(&file) {
            self.reject(PapyrusError::Configuration(format!(
                "File '{file}' is not registered"
            )));
        } else if !self.store.files().exists(&file) {
            self.reject(PapyrusError::Configuration(format!(
                "File '{file}' has no storage at {}",
                self.store.files().path_for(&file).display()
            )));
        } else {
            self.source = Some((file, operation));
        }
        self
    }

    /// Merge a flat field -> value mapping into the payload.
    pub fn values(&mut self, payload: Value) -> &mut Self {
        match record::flat_record(&payload) {
            Ok(fields) if fields.is_empty() => {
                self.reject(PapyrusError::Validation("Payload is empty".into()))
            }
            Ok(fields) => self.payload.extend(fields),
            Err(e) => self.reject(e),
        }
        self
    }

    /// Alias of [`Query::values`] that reads better after `update`.
    pub fn set(&mut self, payload: Value) -> &mut Self {
        self.values(payload)
    }

    /// Set the equality condition, replacing any previous one.
    pub fn where_eq(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.condition = Some(Condition::new(field.trim(), value));
        self
    }

    /// Set the condition from a `{field: value}` object holding exactly one entry.
    pub fn condition(&mut self, conditions: Value) -> &mut Self {
        match conditions {
            Value::Object(map) if map.len() == 1 => {
                if let Some((field, value)) = map.into_iter().next() {
                    self.where_eq(&field, value);
                }
            }
            Value::Object(map) => self.reject(PapyrusError::Validation(format!(
                "A condition must name exactly one field, got {}",
                map.len()
            ))),
            other => self.reject(PapyrusError::Validation(format!(
                "A condition must be an object, got {other}"
            ))),
        }
        self
    }

    /// Order by one field; `direction` must be exactly `ASC` or `DESC`.
    pub fn order_by(&mut self, field: &str, direction: &str) -> &mut Self {
        match direction.parse() {
            Ok(direction) => {
                self.sort = Some(Sort {
                    field: field.trim().to_string(),
                    direction,
                })
            }
            Err(e) => self.reject(e),
        }
        self
    }

    /// Keep at most `n` records; 0 means no limit. Negative values are rejected.
    pub fn limit(&mut self, n: i64) -> &mut Self {
        match usize::try_from(n) {
            Ok(n) => self.limit = n,
            Err(_) => self.reject(PapyrusError::Validation(format!(
                "Limit must be a non-negative integer, got {n}"
            ))),
        }
        self
    }

    /// The operation the query will run, if a source was accepted.
    pub fn operation(&self) -> Option<Operation> {
        self.source.as_ref().map(|(_, op)| *op)
    }

    /// Dispatch the accumulated intent to the engine.
    pub fn execute(&mut self) -> Result<QueryResult> {
        if let Some(err) = &self.rejected {
            return Err(err.replay());
        }
        let (file, operation) = self.source.as_ref().ok_or_else(|| {
            PapyrusError::Configuration("No source file selected".into())
        })?;
        let collection = self.store.collection(file)?;
        log::debug!("execute {operation:?} on {file}");

        match operation {
            Operation::Fetch => {
                let options = FetchOptions {
                    fields: self.fields.clone(),
                    condition: self.condition.clone(),
                    sort: self.sort.clone(),
                    limit: self.limit,
                };
                Ok(QueryResult::Fetched(collection.fetch(&options)?))
            }
            Operation::Insert => Ok(QueryResult::Inserted(collection.insert(&self.payload)?)),
            Operation::Update => Ok(QueryResult::Updated(
                collection.update(&self.payload, self.condition.as_ref())?,
            )),
            Operation::Delete => Ok(QueryResult::Deleted(
                collection.delete(self.condition.as_ref())?,
            )),
        }
    }
}

/// What an executed query produced.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Fetched(Fetched),
    Inserted(InsertOutcome),
    Updated(UpdateOutcome),
    Deleted(DeleteOutcome),
}

impl QueryResult {
    /// Fetched records; empty for every other operation.
    pub fn records(&self) -> &[Record] {
        match self {
            QueryResult::Fetched(fetched) => fetched.records(),
            _ => &[],
        }
    }

    /// The single record of a keyed fetch, or the record an insert appended.
    pub fn record(&self) -> Option<&Record> {
        match self {
            QueryResult::Fetched(Fetched::One(record)) => record.as_ref(),
            QueryResult::Inserted(InsertOutcome::Inserted(record)) => Some(record),
            _ => None,
        }
    }

    pub fn into_records(self) -> RecordSet {
        match self {
            QueryResult::Fetched(fetched) => fetched.into_records(),
            _ => Vec::new(),
        }
    }

    /// Whether the operation took effect: an insert that appended, an update
    /// that rewrote the file, any fetch or delete.
    pub fn succeeded(&self) -> bool {
        match self {
            QueryResult::Fetched(_) | QueryResult::Deleted(_) => true,
            QueryResult::Inserted(outcome) => outcome.is_inserted(),
            QueryResult::Updated(outcome) => outcome.written,
        }
    }

    /// JSON rendering used by the CLI.
    pub fn to_json(&self) -> Value {
        match self {
            QueryResult::Fetched(Fetched::One(record)) => record
                .as_ref()
                .map(|r| Value::Object(r.clone()))
                .unwrap_or(Value::Null),
            QueryResult::Fetched(Fetched::Many(records)) => Value::Array(
                records.iter().map(|r| Value::Object(r.clone())).collect(),
            ),
            QueryResult::Inserted(InsertOutcome::Inserted(record)) => {
                serde_json::json!({ "ok": true, "inserted": record })
            }
            QueryResult::Inserted(InsertOutcome::DuplicateKey(key)) => {
                serde_json::json!({ "ok": false, "duplicate_key": key })
            }
            QueryResult::Updated(outcome) => {
                serde_json::json!({ "ok": outcome.written, "matched": outcome.matched })
            }
            QueryResult::Deleted(DeleteOutcome::Removed(n)) => {
                serde_json::json!({ "ok": true, "removed": n })
            }
            QueryResult::Deleted(DeleteOutcome::Truncated) => {
                serde_json::json!({ "ok": true, "truncated": true })
            }
        }
    }
}
