//! Tests for pagination module

use super::*;
use crate::error::Error;
use serde_json::json;

// ============================================================================
// Continuation Tests
// ============================================================================

#[test]
fn test_continuation_reads_next_and_last() {
    let c = Continuation::from_response(&json!({
        "posts": [],
        "next": "2020-06-01T00:00:00.000Z#3",
        "last": true
    }))
    .unwrap();
    assert_eq!(c.next.as_deref(), Some("2020-06-01T00:00:00.000Z#3"));
    assert!(c.last);
}

#[test]
fn test_continuation_defaults() {
    let c = Continuation::from_response(&json!({"posts": []})).unwrap();
    assert_eq!(c, Continuation::default());

    let c = Continuation::from_response(&json!({"next": null, "last": "yes"})).unwrap();
    assert_eq!(c, Continuation::default());

    let c = Continuation::from_response(&json!([1, 2])).unwrap();
    assert_eq!(c, Continuation::default());
}

#[test]
fn test_continuation_numeric_last_flag() {
    assert!(Continuation::from_response(&json!({"last": 1})).unwrap().last);
    assert!(!Continuation::from_response(&json!({"last": 0})).unwrap().last);
}

#[test]
fn test_continuation_rejects_non_string_next() {
    let err = Continuation::from_response(&json!({"next": 12})).unwrap_err();
    assert!(matches!(err, Error::CursorFormat { .. }));
}

// ============================================================================
// PagingOptions Tests
// ============================================================================

#[test]
fn test_paging_options_default() {
    let options = PagingOptions::default();
    assert!(options.start.is_none());
    assert!(options.end.is_none());
    assert_eq!(options.retry_limit, DEFAULT_RETRY_LIMIT);
    assert!(!options.ignore_last);
}

#[test]
fn test_paging_options_builder() {
    let options = PagingOptions::new()
        .with_start_key("2020-01-01T00:00:00Z")
        .unwrap()
        .with_end_key("2020-02-01T00:00:00Z#4")
        .unwrap()
        .with_retry_limit(3)
        .with_ignore_last(true);

    assert_eq!(options.end.unwrap().sequence(), Some(4));
    assert!(options.start.is_some());
    assert_eq!(options.retry_limit, 3);
    assert!(options.ignore_last);
}

#[test]
fn test_paging_options_reject_malformed_keys() {
    let err = PagingOptions::new().with_start_key("yesterday").unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "start_key"));

    let err = PagingOptions::new().with_end_key("").unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "end_key"));
}

// ============================================================================
// Reducer Tests
// ============================================================================

#[test]
fn test_field_reducer_takes_array() {
    let mut raw = json!({"posts": [{"_id": 1}, {"_id": 2}], "next": "x"});
    let records = field("posts")(&mut raw);
    assert_eq!(records.len(), 2);
    assert_eq!(raw["next"], "x");
}

#[test]
fn test_field_reducer_missing_key_is_empty() {
    let mut raw = json!({"next": "x"});
    assert!(field("posts")(&mut raw).is_empty());

    let mut raw = json!({"posts": "oops"});
    assert!(field("posts")(&mut raw).is_empty());
}

#[test]
fn test_identity_reducer() {
    let mut raw = json!([{"a": 1}]);
    assert_eq!(identity(&mut raw), vec![json!({"a": 1})]);

    let mut raw = json!({"next": "x"});
    assert!(identity(&mut raw).is_empty());
    assert_eq!(raw["next"], "x");
}
