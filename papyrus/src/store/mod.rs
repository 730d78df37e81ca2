mod types;

pub use types::{
    Condition, DeleteOutcome, FetchOptions, Fetched, InsertOutcome, Sort, UpdateOutcome,
};

use crate::error::{PapyrusError, Result};
use crate::query::Query;
use crate::record::{self, Record, RecordSet};
use crate::schema::{parse_config, FileDefinition, KeyKind, PrimaryKey, SchemaRegistry, StoreConfig};
use crate::storage::FileStore;
use crate::validation;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Name of the configuration file inside a data directory.
pub const CONFIG_FILE: &str = "papyrus.yaml";

/// The main entry point for Papyrus.
/// Opens a data directory, resolves the file definitions in papyrus.yaml,
/// and hands out collection handles that run fetch/insert/update/delete.
pub struct Store {
    root: PathBuf,
    registry: SchemaRegistry,
    files: FileStore,
}

impl Store {
    /// Open a Papyrus store at the given data directory path.
    /// Parses papyrus.yaml and creates any registered file that does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(PapyrusError::Other(format!(
                "Data directory does not exist: {}",
                root.display()
            )));
        }

        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(PapyrusError::Configuration(format!(
                "{CONFIG_FILE} not found in {}",
                root.display()
            )));
        }

        let config = parse_config(&config_path)?;
        Self::with_config(root, &config)
    }

    /// Open a store from an already parsed configuration.
    pub fn with_config(root: impl Into<PathBuf>, config: &StoreConfig) -> Result<Self> {
        let root = root.into();
        let registry = SchemaRegistry::from_config(config)?;
        let files = FileStore::new(&root, registry.extension());

        for definition in registry.files() {
            files.ensure(&definition.name)?;
        }

        Ok(Store {
            root,
            registry,
            files,
        })
    }

    /// Get a handle on a registered file
    pub fn collection(&self, name: &str) -> Result<Collection<'_>> {
        let definition = self.registry.get(name)?;
        Ok(Collection {
            store: self,
            definition,
        })
    }

    /// Start a fluent query against this store.
    pub fn query(&self) -> Query<'_> {
        Query::new(self)
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Status information: extension, and per file its path, size and key.
    pub fn status(&self) -> Result<Value> {
        let mut files = serde_json::Map::new();

        for definition in self.registry.files() {
            let count = self.collection(&definition.name)?.count()?;
            let key = definition.primary_key.as_ref().map(|k| {
                serde_json::json!({ "field": k.field, "kind": k.kind.marker() })
            });
            files.insert(
                definition.name.clone(),
                serde_json::json!({
                    "path": self.files.path_for(&definition.name).display().to_string(),
                    "count": count,
                    "fields": definition.fields,
                    "primary_key": key,
                }),
            );
        }

        Ok(serde_json::json!({
            "root": self.root.display().to_string(),
            "extension": self.registry.extension(),
            "files": files,
        }))
    }

    /// Check every stored record against its file definition.
    /// Returns a report of records with unknown or missing fields, key values
    /// of the wrong type and duplicated unique keys.
    pub fn validate_all(&self) -> Result<Value> {
        let mut results = serde_json::Map::new();

        for definition in self.registry.files() {
            let records = self.collection(&definition.name)?.read_all()?;
            let issues: Vec<Value> = validation::validate_records(definition, &records)
                .into_iter()
                .map(|issue| serde_json::json!({ "index": issue.index, "errors": issue.errors }))
                .collect();
            results.insert(
                definition.name.clone(),
                serde_json::json!({
                    "total": records.len(),
                    "issues": issues,
                }),
            );
        }

        Ok(Value::Object(results))
    }
}

/// A handle to one logical file within a store.
/// Every operation is a synchronous read, compute, rewrite cycle over the
/// whole record set, run under the file's advisory lock.
pub struct Collection<'a> {
    store: &'a Store,
    definition: &'a FileDefinition,
}

impl<'a> Collection<'a> {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &FileDefinition {
        self.definition
    }

    /// Read the full record set as stored.
    pub fn read_all(&self) -> Result<RecordSet> {
        let _lock = self.store.files.lock_shared(self.name())?;
        self.store.files.read(self.name())
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    /// Fetch records.
    ///
    /// With a condition, returns the record whose primary key equals the
    /// condition value (sort and limit do not apply). Without one, returns the
    /// whole set sorted, then truncated to `limit`. Projection is applied last.
    /// No match is an empty result, never an error.
    pub fn fetch(&self, options: &FetchOptions) -> Result<Fetched> {
        self.check_fields(&options.fields, "select")?;
        if let Some(sort) = &options.sort {
            self.check_fields(std::slice::from_ref(&sort.field), "sort")?;
        }

        match &options.condition {
            Some(condition) => {
                let key = self.key_for_condition(condition, "keyed fetch")?;
                let records = self.read_all()?;
                let found = find_by_key(&records, &key.field, &condition.value)
                    .map(|r| record::project(r, &options.fields));
                log::debug!(
                    "fetch {} where {} = {}: {}",
                    self.name(),
                    condition.field,
                    condition.value,
                    if found.is_some() { "hit" } else { "miss" }
                );
                Ok(Fetched::One(found))
            }
            None => {
                let mut records = self.read_all()?;
                if let Some(sort) = &options.sort {
                    record::sort_by_field(&mut records, &sort.field, sort.direction);
                }
                if options.limit > 0 {
                    records.truncate(options.limit);
                }
                if !options.fields.is_empty() {
                    records = records
                        .iter()
                        .map(|r| record::project(r, &options.fields))
                        .collect();
                }
                log::debug!("fetch {}: {} records", self.name(), records.len());
                Ok(Fetched::Many(records))
            }
        }
    }

    /// Fetch the record with the given primary key value.
    pub fn get(&self, key: impl Into<Value>) -> Result<Option<Record>> {
        let field = self.definition.require_key("get")?.field.clone();
        let options = FetchOptions {
            condition: Some(Condition::new(field, key)),
            ..FetchOptions::default()
        };
        Ok(self.fetch(&options)?.into_records().into_iter().next())
    }

    /// Insert one record.
    ///
    /// Unique keys must be supplied with the right scalar type; a value that
    /// already exists yields `DuplicateKey` and nothing is written.
    /// Auto-increment keys are assigned as the key of the last record in the
    /// file plus one (1 for an empty file), replacing any supplied value. A last
    /// key that is not an integer, or cannot be incremented, is a validation error.
    pub fn insert(&self, payload: &Record) -> Result<InsertOutcome> {
        let key = self.definition.require_key("insert")?;
        self.check_payload(payload, "insert")?;

        match key.kind {
            KeyKind::UniqueInt | KeyKind::UniqueString => {
                let value = payload.get(&key.field).ok_or_else(|| {
                    PapyrusError::Validation(format!(
                        "Insert into '{}' must supply key field '{}'",
                        self.name(),
                        key.field
                    ))
                })?;
                check_key_type(key, value)?;
                let record = record::canonicalize(payload, &self.definition.fields);

                let _lock = self.store.files.lock_exclusive(self.name())?;
                let mut records = self.store.files.read(self.name())?;
                if find_by_key(&records, &key.field, value).is_some() {
                    log::debug!(
                        "insert into {} rejected: key {} = {} exists",
                        self.name(),
                        key.field,
                        value
                    );
                    return Ok(InsertOutcome::DuplicateKey(value.clone()));
                }

                records.push(record.clone());
                self.store.files.write(self.name(), &records)?;
                log::debug!("insert into {}: key {} = {}", self.name(), key.field, value);
                Ok(InsertOutcome::Inserted(record))
            }
            KeyKind::AutoIncrementInt => {
                let _lock = self.store.files.lock_exclusive(self.name())?;
                let mut records = self.store.files.read(self.name())?;
                let next = next_auto_key(key, records.last())?;

                let mut payload = payload.clone();
                payload.insert(key.field.clone(), next.clone());
                let record = record::canonicalize(&payload, &self.definition.fields);

                records.push(record.clone());
                self.store.files.write(self.name(), &records)?;
                log::debug!("insert into {}: assigned {} = {next}", self.name(), key.field);
                Ok(InsertOutcome::Inserted(record))
            }
        }
    }

    /// Update records.
    ///
    /// With a condition, merges the payload into the record whose primary key
    /// matches. Fields whose payload value is empty (null, false, 0, "", "0",
    /// empty collections) are skipped, so they keep their stored value. The
    /// file is rewritten whenever it holds any record, match or not.
    ///
    /// Without a condition, every record gets each payload field it already
    /// has overwritten, empty values included. The payload must not name the
    /// primary key.
    pub fn update(&self, payload: &Record, condition: Option<&Condition>) -> Result<UpdateOutcome> {
        let key = self.definition.require_key("update")?;
        self.check_payload(payload, "update")?;

        match condition {
            Some(condition) => self.update_by_key(key, payload, condition),
            None => self.update_all(key, payload),
        }
    }

    fn update_by_key(
        &self,
        key: &PrimaryKey,
        payload: &Record,
        condition: &Condition,
    ) -> Result<UpdateOutcome> {
        self.key_for_condition(condition, "keyed update")?;

        let mut changes = payload.clone();
        if key.kind == KeyKind::AutoIncrementInt {
            // generated keys never move: the key stays pinned to the condition value
            changes.insert(key.field.clone(), condition.value.clone());
        }
        let changes = record::without_empty_values(record::canonicalize(
            &changes,
            &self.definition.fields,
        ));
        if let Some(new_key) = changes.get(&key.field) {
            check_key_type(key, new_key)?;
        }

        let _lock = self.store.files.lock_exclusive(self.name())?;
        let mut records = self.store.files.read(self.name())?;
        if records.is_empty() {
            return Ok(UpdateOutcome {
                matched: 0,
                written: false,
            });
        }

        if let Some(new_key) = changes.get(&key.field) {
            if *new_key != condition.value && find_by_key(&records, &key.field, new_key).is_some() {
                return Err(PapyrusError::Validation(format!(
                    "Cannot change '{}' to {new_key}: key already exists in '{}'",
                    key.field,
                    self.name()
                )));
            }
        }

        let mut matched = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.get(&key.field) == Some(&condition.value))
        {
            for (field, value) in &changes {
                record.insert(field.clone(), value.clone());
            }
            matched += 1;
        }

        self.store.files.write(self.name(), &records)?;
        log::debug!(
            "update {} where {} = {}: {matched} matched",
            self.name(),
            key.field,
            condition.value
        );
        Ok(UpdateOutcome {
            matched,
            written: true,
        })
    }

    fn update_all(&self, key: &PrimaryKey, payload: &Record) -> Result<UpdateOutcome> {
        if payload.contains_key(&key.field) {
            return Err(PapyrusError::Validation(format!(
                "Update without condition must not set key field '{}'",
                key.field
            )));
        }

        let _lock = self.store.files.lock_exclusive(self.name())?;
        let mut records = self.store.files.read(self.name())?;
        for record in records.iter_mut() {
            for (field, value) in payload {
                if let Some(slot) = record.get_mut(field) {
                    *slot = value.clone();
                }
            }
        }

        self.store.files.write(self.name(), &records)?;
        log::debug!("update {}: {} records", self.name(), records.len());
        Ok(UpdateOutcome {
            matched: records.len(),
            written: true,
        })
    }

    /// Delete records.
    ///
    /// With a condition, removes the records whose primary key matches and
    /// rewrites the rest in their original order. Without one, empties the file.
    pub fn delete(&self, condition: Option<&Condition>) -> Result<DeleteOutcome> {
        let Some(condition) = condition else {
            let _lock = self.store.files.lock_exclusive(self.name())?;
            self.store.files.write(self.name(), &[])?;
            log::debug!("delete from {}: truncated", self.name());
            return Ok(DeleteOutcome::Truncated);
        };

        let key = self.key_for_condition(condition, "keyed delete")?;

        let _lock = self.store.files.lock_exclusive(self.name())?;
        let mut records = self.store.files.read(self.name())?;
        let before = records.len();
        records.retain(|r| r.get(&key.field) != Some(&condition.value));
        let removed = before - records.len();

        self.store.files.write(self.name(), &records)?;
        log::debug!(
            "delete from {} where {} = {}: {removed} removed",
            self.name(),
            key.field,
            condition.value
        );
        Ok(DeleteOutcome::Removed(removed))
    }

    /// Resolve the primary key a condition must target.
    fn key_for_condition(&self, condition: &Condition, operation: &str) -> Result<&'a PrimaryKey> {
        let key = self.definition.require_key(operation)?;
        if condition.field != key.field {
            return Err(PapyrusError::Validation(format!(
                "Conditions on '{}' may only use the primary key '{}', got '{}'",
                self.name(),
                key.field,
                condition.field
            )));
        }
        check_key_type(key, &condition.value)?;
        Ok(key)
    }

    fn check_fields(&self, fields: &[String], purpose: &str) -> Result<()> {
        if let Some(unknown) = fields.iter().find(|f| !self.definition.has_field(f)) {
            return Err(PapyrusError::Validation(format!(
                "Cannot {purpose} unknown field '{unknown}' of '{}'",
                self.name()
            )));
        }
        Ok(())
    }

    fn check_payload(&self, payload: &Record, operation: &str) -> Result<()> {
        if payload.is_empty() {
            return Err(PapyrusError::Validation(format!(
                "Cannot {operation} '{}' with an empty payload",
                self.name()
            )));
        }
        record::ensure_flat(payload)
    }
}

fn check_key_type(key: &PrimaryKey, value: &Value) -> Result<()> {
    if key.kind.accepts(value) {
        Ok(())
    } else {
        Err(PapyrusError::Validation(format!(
            "Key field '{}' expects {}, got {value}",
            key.field,
            key.kind.type_name()
        )))
    }
}

/// Key for the next auto-increment insert: the last record's key plus one,
/// or 1 for an empty file.
fn next_auto_key(key: &PrimaryKey, last: Option<&Record>) -> Result<Value> {
    let Some(last) = last else {
        return Ok(Value::from(1));
    };
    let current = last.get(&key.field).unwrap_or(&Value::Null);
    let next = match (current.as_u64(), current.as_i64()) {
        (Some(n), _) => n.checked_add(1).map(Value::from),
        (None, Some(n)) => n.checked_add(1).map(Value::from),
        (None, None) => {
            return Err(PapyrusError::Validation(format!(
                "Cannot generate '{}': last record holds non-integer key {current}",
                key.field
            )))
        }
    };
    next.ok_or_else(|| {
        PapyrusError::Validation(format!(
            "Cannot generate '{}': key {current} is at the integer limit",
            key.field
        ))
    })
}

/// The record whose `field` strictly equals `value`.
fn find_by_key<'r>(records: &'r [Record], field: &str, value: &Value) -> Option<&'r Record> {
    records.iter().find(|r| r.get(field) == Some(value))
}
