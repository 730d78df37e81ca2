use super::types::{FileDefinition, KeyKind, PrimaryKey, StoreConfig};
use crate::error::{PapyrusError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Parse a papyrus.yaml file into a StoreConfig
pub fn parse_config(path: &Path) -> Result<StoreConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse a papyrus.yaml string into a StoreConfig
pub fn parse_config_str(content: &str) -> Result<StoreConfig> {
    let config: StoreConfig = serde_yaml::from_str(content)?;
    if config.extension.trim().trim_start_matches('.').is_empty() {
        return Err(PapyrusError::Configuration(
            "extension must not be empty".into(),
        ));
    }
    Ok(config)
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(?:\(([^)]*)\))?$")
            .expect("field declaration pattern is valid")
    })
}

/// Parse the declared field list of one logical file.
///
/// Each entry is either a bare name or `name(kind)` with kind one of `str#`,
/// `int#`, `int++`. At most one entry may carry a marker; the stored field list
/// keeps declaration order with markers stripped.
pub fn parse_file_definition(name: &str, declarations: &[String]) -> Result<FileDefinition> {
    let mut fields: Vec<String> = Vec::with_capacity(declarations.len());
    let mut primary_key: Option<PrimaryKey> = None;

    for raw in declarations {
        let decl = raw.trim();
        let caps = field_pattern().captures(decl).ok_or_else(|| {
            PapyrusError::Configuration(format!(
                "File '{name}': invalid field declaration '{raw}'"
            ))
        })?;
        let field = caps[1].to_string();

        if fields.contains(&field) {
            return Err(PapyrusError::Configuration(format!(
                "File '{name}': field '{field}' is declared twice"
            )));
        }

        if let Some(marker) = caps.get(2) {
            let kind = KeyKind::from_marker(marker.as_str()).ok_or_else(|| {
                PapyrusError::Configuration(format!(
                    "File '{name}': unknown key marker '{}' on field '{field}' (expected str#, int# or int++)",
                    marker.as_str()
                ))
            })?;
            if let Some(existing) = &primary_key {
                return Err(PapyrusError::Configuration(format!(
                    "File '{name}': only one primary key allowed, found '{}' and '{field}'",
                    existing.field
                )));
            }
            primary_key = Some(PrimaryKey {
                field: field.clone(),
                kind,
            });
        }

        fields.push(field);
    }

    Ok(FileDefinition {
        name: name.to_string(),
        fields,
        primary_key,
    })
}
