//! Tests for session module

use super::*;
use crate::http::{RateGovernor, RateGovernorConfig};
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};

fn cookies(values: &[&str]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for value in values {
        headers.append(SET_COOKIE, HeaderValue::from_str(value).unwrap());
    }
    headers
}

// ============================================================================
// Credentials Tests
// ============================================================================

#[test]
fn test_cookie_header_encodes_tokens() {
    let creds = Credentials::new("m/1", "j=2");
    assert_eq!(creds.cookie_header(), "jst=j%3D2; mst=m%2F1");
}

#[test]
fn test_credentials_debug_is_redacted() {
    let creds = Credentials::new("secret-mst", "secret-jst");
    let debug = format!("{creds:?}");
    assert!(!debug.contains("secret"));
    assert!(debug.contains("REDACTED"));

    let session = Session::new(creds);
    assert!(!format!("{session:?}").contains("secret"));
}

// ============================================================================
// Session Tests
// ============================================================================

#[test]
fn test_session_rotates_jst() {
    let session = Session::new(Credentials::new("m1", "j1"));
    let rotated = session.apply_headers(&cookies(&[
        "jst=j2; Path=/; HttpOnly",
        "unrelated=1; Path=/",
    ]));

    assert!(rotated);
    assert_eq!(session.credentials(), Credentials::new("m1", "j2"));
}

#[test]
fn test_session_decodes_cookie_values() {
    let session = Session::new(Credentials::new("m1", "j1"));
    session.apply_headers(&cookies(&["mst=a%2Fb%3D%3D; Secure"]));
    assert_eq!(session.credentials().mst, "a/b==");
    assert_eq!(session.credentials().cookie_header(), "jst=j1; mst=a%2Fb%3D%3D");
}

#[test]
fn test_session_keeps_plus_in_rotated_token() {
    let session = Session::new(Credentials::new("m1", "j1"));
    assert!(session.apply_headers(&cookies(&["mst=ab+cd/ef==; Path=/"])));
    assert_eq!(session.credentials().mst, "ab+cd/ef==");
    assert_eq!(session.subscribe().borrow().mst, "ab+cd/ef==");
    assert_eq!(
        session.credentials().cookie_header(),
        "jst=j1; mst=ab%2Bcd%2Fef%3D%3D"
    );
}

#[test]
fn test_session_ignores_unchanged_and_missing() {
    let session = Session::new(Credentials::new("m1", "j1"));
    assert!(!session.apply_headers(&HeaderMap::new()));
    assert!(!session.apply_headers(&cookies(&["jst=j1"])));
    assert!(!session.apply_headers(&cookies(&["garbage", "=nameless"])));
    assert_eq!(session.credentials(), Credentials::new("m1", "j1"));
}

#[tokio::test]
async fn test_session_notifies_subscribers() {
    let session = Session::new(Credentials::new("m1", "j1"));
    let mut rx = session.subscribe();

    session.apply_headers(&cookies(&["jst=j2", "mst=m2"]));

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), Credentials::new("m2", "j2"));
}

#[test]
fn test_session_clones_share_tokens() {
    let session = Session::new(Credentials::new("m1", "j1"));
    let clone = session.clone();
    session.apply_headers(&cookies(&["jst=j9"]));
    assert_eq!(clone.credentials().jst, "j9");
}

// ============================================================================
// SessionBridge Tests
// ============================================================================

#[test]
fn test_bridge_feeds_both_collaborators() {
    let session = Session::new(Credentials::new("m1", "j1"));
    let governor = RateGovernor::new(RateGovernorConfig::unthrottled());
    let bridge = SessionBridge::new(session.clone(), governor.clone());

    let mut headers = cookies(&["jst=j2"]);
    headers.insert("x-ratelimit-remaining", HeaderValue::from_static("5"));

    assert!(bridge.observe(&headers));
    assert_eq!(session.credentials().jst, "j2");
    assert_eq!(governor.snapshot().remaining, Some(5));
}
