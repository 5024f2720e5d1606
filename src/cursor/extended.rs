//! Extended timestamp parsing, ordering and formatting

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Separator written when a key carries no suffix of its own
const DEFAULT_SEPARATOR: char = '#';

static EXTENDED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<ts>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?(?:Z|[+-]\d{2}:\d{2}))(?:(?P<sep>[#_])(?P<seq>\d{1,19}))?$",
    )
    .expect("extended key pattern is valid")
});

/// A parsed extended-timestamp pagination key.
///
/// Cursors are totally ordered by instant, then by sequence suffix. A key
/// without a suffix sorts before every suffixed key at the same instant.
/// The raw server string is kept so that continuation keys are echoed back
/// byte-for-byte.
#[derive(Debug, Clone)]
pub struct Cursor {
    raw: String,
    instant: DateTime<Utc>,
    sequence: Option<u64>,
    separator: char,
}

impl Cursor {
    /// Parse an extended timestamp key
    pub fn parse(raw: &str) -> Result<Self> {
        let caps = EXTENDED_KEY
            .captures(raw.trim())
            .ok_or_else(|| Error::cursor_format(raw))?;

        let instant = DateTime::parse_from_rfc3339(&caps["ts"])
            .map_err(|_| Error::cursor_format(raw))?
            .with_timezone(&Utc);

        let sequence = match caps.name("seq") {
            Some(seq) => Some(
                seq.as_str()
                    .parse::<u64>()
                    .map_err(|_| Error::cursor_format(raw))?,
            ),
            None => None,
        };

        let separator = caps
            .name("sep")
            .and_then(|m| m.as_str().chars().next())
            .unwrap_or(DEFAULT_SEPARATOR);

        Ok(Self {
            raw: raw.trim().to_string(),
            instant,
            sequence,
            separator,
        })
    }

    /// Parse an optional key; `None` and empty strings mean "server default"
    pub fn parse_optional(raw: Option<&str>) -> Result<Option<Self>> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => Self::parse(value).map(Some),
        }
    }

    /// The instant component
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// The same-instant tie-breaker, if present
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// The key exactly as it was received
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Serialize the key.
    ///
    /// With `as_start` unset the original string is returned untouched.
    /// With `as_start` set the key is normalized to a UTC millisecond
    /// timestamp with an explicit suffix (`#0` when none was given), which
    /// is the shape the server accepts as a request-time `startkey`.
    pub fn format(&self, as_start: bool) -> String {
        if !as_start {
            return self.raw.clone();
        }

        let precision = if self.instant.timestamp_subsec_nanos() % 1_000_000 == 0 {
            SecondsFormat::Millis
        } else {
            SecondsFormat::Nanos
        };

        format!(
            "{}{}{}",
            self.instant.to_rfc3339_opts(precision, true),
            self.separator,
            self.sequence.unwrap_or(0)
        )
    }

    /// True when `self` is strictly later than `other`
    pub fn is_after(&self, other: &Cursor) -> bool {
        self.cmp(other) == Ordering::Greater
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cursor {}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant
            .cmp(&other.instant)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl FromStr for Cursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
