use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level store configuration parsed from papyrus.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Extension appended to every logical file name on disk
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Logical file name -> ordered field declarations, e.g. `["dni(int#)", "name"]`
    #[serde(default)]
    pub files: BTreeMap<String, Vec<String>>,
}

fn default_extension() -> String {
    ".data".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            extension: default_extension(),
            files: BTreeMap::new(),
        }
    }
}

impl StoreConfig {
    /// The extension with a guaranteed leading dot.
    pub fn normalized_extension(&self) -> String {
        let ext = self.extension.trim();
        if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        }
    }
}

/// Kind of primary key a file declares through its `name(kind)` marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// `int++`: integer assigned by the engine on insert
    AutoIncrementInt,
    /// `int#`: caller-supplied integer, unique across the file
    UniqueInt,
    /// `str#`: caller-supplied string, unique across the file
    UniqueString,
}

impl KeyKind {
    /// Resolve a marker token as written between the parentheses.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "int++" => Some(KeyKind::AutoIncrementInt),
            "int#" => Some(KeyKind::UniqueInt),
            "str#" => Some(KeyKind::UniqueString),
            _ => None,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            KeyKind::AutoIncrementInt => "int++",
            KeyKind::UniqueInt => "int#",
            KeyKind::UniqueString => "str#",
        }
    }

    /// Whether the caller must supply the key value (and the engine checks uniqueness).
    pub fn is_unique(&self) -> bool {
        matches!(self, KeyKind::UniqueInt | KeyKind::UniqueString)
    }

    /// Whether `value` has the scalar type this key kind stores.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            KeyKind::UniqueString => value.is_string(),
            KeyKind::UniqueInt | KeyKind::AutoIncrementInt => {
                value.is_i64() || value.is_u64()
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            KeyKind::UniqueString => "string",
            KeyKind::UniqueInt | KeyKind::AutoIncrementInt => "integer",
        }
    }
}

/// The single field of a file that carries a key marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub field: String,
    pub kind: KeyKind,
}

/// Resolved definition of one logical file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDefinition {
    pub name: String,
    /// Field names in declaration order, markers stripped
    pub fields: Vec<String>,
    pub primary_key: Option<PrimaryKey>,
}

impl FileDefinition {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Returns the primary key, or a configuration error naming the operation
    /// that needed it.
    pub fn require_key(&self, operation: &str) -> crate::Result<&PrimaryKey> {
        self.primary_key.as_ref().ok_or_else(|| {
            crate::PapyrusError::Configuration(format!(
                "File '{}' declares no primary key; {operation} requires one",
                self.name
            ))
        })
    }
}
