//! Record extraction from raw responses

use crate::types::{JsonValue, Record};

/// Treat the response itself as the record sequence
pub fn identity(raw: &mut JsonValue) -> Vec<Record> {
    match raw.take() {
        JsonValue::Array(records) => records,
        JsonValue::Null => Vec::new(),
        other => {
            // put it back so continuation fields stay readable
            *raw = other;
            Vec::new()
        }
    }
}

/// Take the array stored under `key`; a missing or non-array value is an empty page
pub fn field(key: &str) -> impl FnMut(&mut JsonValue) -> Vec<Record> + Send + '_ {
    move |raw| match raw.get_mut(key).map(JsonValue::take) {
        Some(JsonValue::Array(records)) => records,
        _ => Vec::new(),
    }
}
