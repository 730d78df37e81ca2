//! File Store: one JSON array per logical file at `<root>/<name><extension>`.
//!
//! Every write replaces the whole array. The new contents go to a temporary
//! file in the same directory which is then renamed over the old one, so a
//! reader never observes a half-written array.

mod lock;

pub use lock::FileLock;

use crate::error::Result;
use crate::record::{Record, RecordSet};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;

/// Reads and rewrites the record arrays of a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    extension: String,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        FileStore {
            root: root.into(),
            extension: extension.to_string(),
        }
    }

    /// Full path of a logical file.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}{}", self.extension))
    }

    fn lock_path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!(".{name}{}.lock", self.extension))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Create the file holding an empty array if it does not exist yet.
    /// Returns true when a file was created.
    pub fn ensure(&self, name: &str) -> Result<bool> {
        if self.exists(name) {
            return Ok(false);
        }
        self.write(name, &[])?;
        log::info!("Created empty record file {}", self.path_for(name).display());
        Ok(true)
    }

    /// Take the lock a reader holds for the duration of one fetch.
    pub fn lock_shared(&self, name: &str) -> Result<FileLock> {
        Ok(FileLock::shared(&self.lock_path_for(name))?)
    }

    /// Take the lock a writer holds across its read-compute-write cycle.
    pub fn lock_exclusive(&self, name: &str) -> Result<FileLock> {
        Ok(FileLock::exclusive(&self.lock_path_for(name))?)
    }

    /// Read the whole record set of a logical file.
    ///
    /// A missing or unreadable file is an I/O error. Blank content or JSON that
    /// is not an array reads as an empty set; array elements that are not
    /// objects are skipped.
    pub fn read(&self, name: &str) -> Result<RecordSet> {
        let path = self.path_for(name);
        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let value: Value = serde_json::from_str(&content)?;
        let items = match value {
            Value::Array(items) => items,
            other => {
                log::warn!(
                    "{} does not hold a JSON array (found {}); reading it as empty",
                    path.display(),
                    json_type_name(&other)
                );
                return Ok(Vec::new());
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(map) => records.push(map),
                other => log::warn!(
                    "Skipping element {index} of {}: expected object, got {}",
                    path.display(),
                    json_type_name(&other)
                ),
            }
        }
        Ok(records)
    }

    /// Replace the whole contents of a logical file with `records`.
    pub fn write(&self, name: &str, records: &[Record]) -> Result<()> {
        let path = self.path_for(name);
        let dir = path.parent().unwrap_or(self.root.as_path());
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_vec(records)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        log::debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
