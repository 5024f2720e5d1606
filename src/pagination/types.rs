//! Pagination types
//!
//! Per-run options and the continuation metadata read from each response.

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::types::JsonValue;

/// Retries allowed per page before an export is abandoned
pub const DEFAULT_RETRY_LIMIT: u32 = 10;

const NEXT_FIELD: &str = "next";
const LAST_FIELD: &str = "last";

/// Options for one paged export, resolved before the first request
#[derive(Debug, Clone)]
pub struct PagingOptions {
    /// Cursor seeding the first request
    pub start: Option<Cursor>,
    /// Stop once the next cursor reaches this key
    pub end: Option<Cursor>,
    /// Consecutive fetch failures tolerated per page
    pub retry_limit: u32,
    /// Keep going even when the server flags the last page
    pub ignore_last: bool,
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            retry_limit: DEFAULT_RETRY_LIMIT,
            ignore_last: false,
        }
    }
}

impl PagingOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the start cursor
    #[must_use]
    pub fn with_start(mut self, start: Cursor) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the end cursor
    #[must_use]
    pub fn with_end(mut self, end: Cursor) -> Self {
        self.end = Some(end);
        self
    }

    /// Parse and set the start key; a malformed key is a configuration error
    pub fn with_start_key(mut self, key: &str) -> Result<Self> {
        self.start = Some(parse_key("start_key", key)?);
        Ok(self)
    }

    /// Parse and set the end key; a malformed key is a configuration error
    pub fn with_end_key(mut self, key: &str) -> Result<Self> {
        self.end = Some(parse_key("end_key", key)?);
        Ok(self)
    }

    /// Set the retry limit
    #[must_use]
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = limit;
        self
    }

    /// Ignore the server's last-page flag
    #[must_use]
    pub fn with_ignore_last(mut self, ignore: bool) -> Self {
        self.ignore_last = ignore;
        self
    }
}

fn parse_key(field: &str, key: &str) -> Result<Cursor> {
    Cursor::parse(key).map_err(|_| {
        Error::invalid_value(field, format!("'{key}' is not a well-formed extended timestamp"))
    })
}

/// Continuation metadata of one response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Continuation {
    /// Raw next cursor, if the server sent one
    pub next: Option<String>,
    /// Server-declared end of stream
    pub last: bool,
}

impl Continuation {
    /// Read `next` and `last` from a response body.
    ///
    /// A `next` that is neither a string nor null cannot be a cursor.
    pub fn from_response(raw: &JsonValue) -> Result<Self> {
        let next = match raw.get(NEXT_FIELD) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) if s.is_empty() => None,
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(other) => return Err(Error::cursor_format(other.to_string())),
        };

        let last = match raw.get(LAST_FIELD) {
            Some(JsonValue::Bool(flag)) => *flag,
            Some(JsonValue::Number(n)) => n.as_u64() == Some(1),
            _ => false,
        };

        Ok(Self { next, last })
    }
}
