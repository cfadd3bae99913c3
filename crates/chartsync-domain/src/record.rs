//! Schemaless clinical rows
//!
//! The relational schema lives outside this layer, so rows travel as
//! JSON objects end to end. These helpers cover the two things every
//! component needs from a row: its identity and field-wise merging.

use serde_json::{Map, Value};

/// One row from a backing table
pub type Record = Map<String, Value>;

/// A row's primary id in string form
///
/// Stores hand out string ids (uuids) but legacy tables still carry
/// integer keys, so both are accepted.
#[must_use]
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether the row's id matches `id` by string form
#[must_use]
pub fn id_matches(record: &Record, id: &str) -> bool {
    record_id(record).is_some_and(|rid| rid == id)
}

/// Owning patient id of a row, when present
#[must_use]
pub fn patient_id_of(record: &Record) -> Option<&str> {
    record.get("patient_id")?.as_str()
}

/// Shallow-merge `src` into `dst`
///
/// Fields present in `src` overwrite; fields absent from `src` survive.
pub fn merge_record(dst: &mut Record, src: &Record) {
    for (key, value) in src {
        dst.insert(key.clone(), value.clone());
    }
}
