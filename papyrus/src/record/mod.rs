// Record shaping - canonical field order, projection, sort keys, empty-value filter

use serde_json::{Map, Value};
use std::cmp::Reverse;

/// One record: field name -> scalar or null, in schema order once canonicalized.
pub type Record = Map<String, Value>;

/// The complete ordered contents of one logical file.
pub type RecordSet = Vec<Record>;

/// Shape a payload to a file's field list: unknown fields are dropped, missing
/// fields are filled with null, and the result follows `fields` order.
pub fn canonicalize(payload: &Record, fields: &[String]) -> Record {
    let mut record = Record::new();
    for field in fields {
        let value = payload.get(field).cloned().unwrap_or(Value::Null);
        record.insert(field.clone(), value);
    }
    record
}

/// Keep only the listed fields. An empty list returns the record unchanged.
/// Surviving fields keep their stored order.
pub fn project(record: &Record, fields: &[String]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    record
        .iter()
        .filter(|(k, _)| fields.iter().any(|f| f == *k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Whether a value counts as "empty" for keyed updates: null, false, zero,
/// "", "0", and empty arrays or objects. Such fields are never merged.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Drop every field whose value is empty per [`is_empty_value`].
pub fn without_empty_values(record: Record) -> Record {
    record
        .into_iter()
        .filter(|(_, v)| !is_empty_value(v))
        .collect()
}

/// Lowercased string rendering used to order records by a field.
pub fn sort_key(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::Bool(true)) => "1".to_string(),
        Some(Value::String(s)) => s.to_lowercase(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

/// Sort direction accepted by fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::str::FromStr for SortDirection {
    type Err = crate::PapyrusError;

    /// Only the exact tokens `ASC` and `DESC` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            other => Err(crate::PapyrusError::Validation(format!(
                "Sort direction must be ASC or DESC, got '{other}'"
            ))),
        }
    }
}

/// Stable, case-insensitive sort of `records` on `field`.
pub fn sort_by_field(records: &mut [Record], field: &str, direction: SortDirection) {
    match direction {
        SortDirection::Asc => records.sort_by_cached_key(|r| sort_key(r.get(field))),
        SortDirection::Desc => records.sort_by_cached_key(|r| Reverse(sort_key(r.get(field)))),
    }
}

/// Reject records holding arrays or objects; stored records are flat.
pub fn ensure_flat(record: &Record) -> crate::Result<()> {
    if let Some((field, _)) = record.iter().find(|(_, v)| v.is_array() || v.is_object()) {
        return Err(crate::PapyrusError::Validation(format!(
            "Payload must be flat; field '{field}' holds a nested value"
        )));
    }
    Ok(())
}

/// Convert an arbitrary JSON value into a flat record.
pub fn flat_record(value: &Value) -> crate::Result<Record> {
    let map = value.as_object().ok_or_else(|| {
        crate::PapyrusError::Validation("Payload must be a JSON object".into())
    })?;
    ensure_flat(map)?;
    Ok(map.clone())
}
