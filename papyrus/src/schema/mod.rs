mod parser;
mod types;

pub use parser::{parse_config, parse_config_str, parse_file_definition};
pub use types::{FileDefinition, KeyKind, PrimaryKey, StoreConfig};

use crate::error::{PapyrusError, Result};
use std::collections::BTreeMap;

/// Immutable set of file definitions, resolved once when the store opens.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    extension: String,
    files: BTreeMap<String, FileDefinition>,
}

impl SchemaRegistry {
    /// Resolve every field list of the configuration, markers included.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let mut files = BTreeMap::new();
        for (name, declarations) in &config.files {
            let name = name.trim();
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(PapyrusError::Configuration(format!(
                    "Invalid file name '{name}'"
                )));
            }
            let definition = parse_file_definition(name, declarations)?;
            files.insert(name.to_string(), definition);
        }

        Ok(SchemaRegistry {
            extension: config.normalized_extension(),
            files,
        })
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Look up a registered file.
    pub fn get(&self, name: &str) -> Result<&FileDefinition> {
        self.files.get(name).ok_or_else(|| {
            PapyrusError::Configuration(format!("File '{name}' is not registered"))
        })
    }

    /// The primary key of `name`, or `None` when the file is unknown or declares none.
    pub fn primary_key_of(&self, name: &str) -> Option<&PrimaryKey> {
        self.files.get(name).and_then(|f| f.primary_key.as_ref())
    }

    pub fn files(&self) -> impl Iterator<Item = &FileDefinition> {
        self.files.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_from_config() {
        let config = parse_config_str(
            "extension: .db\nfiles:\n  users: ['dni(int#)', name]\n  log: [line]\n",
        )
        .unwrap();
        let registry = SchemaRegistry::from_config(&config).unwrap();

        assert_eq!(registry.extension(), ".db");
        assert!(registry.contains("users"));
        assert_eq!(registry.primary_key_of("users").unwrap().field, "dni");
        assert!(registry.primary_key_of("log").is_none());
        assert!(registry.primary_key_of("missing").is_none());
        assert_eq!(registry.files().count(), 2);
    }

    #[test]
    fn test_unknown_file_is_configuration_error() {
        let registry = SchemaRegistry::from_config(&StoreConfig::default()).unwrap();
        let err = registry.get("ghost").unwrap_err();
        assert!(matches!(err, PapyrusError::Configuration(_)));
    }

    #[test]
    fn test_path_like_file_name_rejected() {
        let config = parse_config_str("files:\n  '../etc': [a]\n").unwrap();
        assert!(SchemaRegistry::from_config(&config).is_err());
    }

    #[test]
    fn test_require_key() {
        let config = parse_config_str("files:\n  log: [line]\n").unwrap();
        let registry = SchemaRegistry::from_config(&config).unwrap();
        let err = registry.get("log").unwrap().require_key("insert").unwrap_err();
        assert!(err.to_string().contains("insert"));
    }
}
