use crate::record::Record;
use crate::schema::FileDefinition;
use std::collections::HashMap;

/// Problems found in one stored record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordIssues {
    /// Position of the record in its file
    pub index: usize,
    pub errors: Vec<String>,
}

/// Check a single record's shape against its file definition.
pub fn validate_record(definition: &FileDefinition, record: &Record) -> Vec<String> {
    let mut errors = Vec::new();

    for field in record.keys() {
        if !definition.has_field(field) {
            errors.push(format!("Unexpected field '{field}'"));
        }
    }
    for field in &definition.fields {
        if !record.contains_key(field) {
            errors.push(format!("Missing field '{field}'"));
        }
    }

    if let Some(key) = &definition.primary_key {
        if let Some(value) = record.get(&key.field) {
            if !key.kind.accepts(value) {
                errors.push(format!(
                    "Key field '{}' expected {}, got {value}",
                    key.field,
                    key.kind.type_name()
                ));
            }
        }
    }

    errors
}

/// Check every record of a file, including uniqueness of unique keys.
/// Only records with at least one problem are reported.
pub fn validate_records(definition: &FileDefinition, records: &[Record]) -> Vec<RecordIssues> {
    let mut issues = Vec::new();
    let mut seen_keys: HashMap<String, usize> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        let mut errors = validate_record(definition, record);

        if let Some(key) = definition.primary_key.as_ref().filter(|k| k.kind.is_unique()) {
            if let Some(value) = record.get(&key.field).filter(|v| key.kind.accepts(v)) {
                if let Some(first) = seen_keys.insert(value.to_string(), index) {
                    errors.push(format!("Duplicate key {value} (also at record {first})"));
                }
            }
        }

        if !errors.is_empty() {
            issues.push(RecordIssues { index, errors });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_file_definition;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn users() -> FileDefinition {
        parse_file_definition(
            "users",
            &["dni(int#)".to_string(), "name".to_string()],
        )
        .unwrap()
    }

    fn rec(value: serde_json::Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_valid_record() {
        assert!(validate_record(&users(), &rec(json!({"dni": 1, "name": null}))).is_empty());
    }

    #[test]
    fn test_unknown_and_missing_fields() {
        let errors = validate_record(&users(), &rec(json!({"dni": 1, "age": 3})));
        assert_eq!(
            errors,
            vec!["Unexpected field 'age'".to_string(), "Missing field 'name'".to_string()]
        );
    }

    #[test]
    fn test_wrong_key_type() {
        let errors = validate_record(&users(), &rec(json!({"dni": "1", "name": "a"})));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("expected integer"));
    }

    #[test]
    fn test_duplicate_keys_reported_on_later_record() {
        let records = vec![
            rec(json!({"dni": 1, "name": "a"})),
            rec(json!({"dni": 2, "name": "b"})),
            rec(json!({"dni": 1, "name": "c"})),
        ];
        let issues = validate_records(&users(), &records);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].index, 2);
        assert!(issues[0].errors[0].contains("record 0"));
    }

    #[test]
    fn test_auto_increment_duplicates_not_checked() {
        let notes = parse_file_definition("notes", &["id(int++)".to_string()]).unwrap();
        let records = vec![rec(json!({"id": 1})), rec(json!({"id": 1}))];
        assert!(validate_records(&notes, &records).is_empty());
    }
}
