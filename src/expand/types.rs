//! Expansion configuration types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Foreign-key fields known to the feed payloads
pub const KNOWN_FIELDS: &[&str] = &["creator", "parent", "root", "links"];

/// Which foreign-key fields to resolve.
///
/// Built once from a field → bool map and never mutated afterwards.
/// Fields not mentioned are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, bool>", into = "HashMap<String, bool>")]
pub struct ExpandConfig {
    enabled: BTreeSet<String>,
}

impl ExpandConfig {
    /// Expand nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Expand every known field
    pub fn all() -> Self {
        KNOWN_FIELDS.iter().copied().collect()
    }

    /// Build from a field → enabled map
    pub fn from_flags(flags: &HashMap<String, bool>) -> Self {
        Self {
            enabled: flags
                .iter()
                .filter(|(_, on)| **on)
                .map(|(field, _)| field.clone())
                .collect(),
        }
    }

    /// Also expand `field`
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.enabled.insert(field.into());
        self
    }

    /// Is `field` enabled?
    pub fn is_enabled(&self, field: &str) -> bool {
        self.enabled.contains(field)
    }

    /// Is anything enabled?
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for ExpandConfig {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            enabled: iter.into_iter().map(str::to_string).collect(),
        }
    }
}

impl From<HashMap<String, bool>> for ExpandConfig {
    fn from(flags: HashMap<String, bool>) -> Self {
        Self::from_flags(&flags)
    }
}

impl From<ExpandConfig> for HashMap<String, bool> {
    fn from(config: ExpandConfig) -> Self {
        config.enabled.into_iter().map(|f| (f, true)).collect()
    }
}

/// Resolve `fields` on each object in the `targets` array against the
/// sibling `refs` array of the same payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionRule {
    /// Array holding the records to link
    pub targets: &'static str,
    /// Array holding the referenced records
    pub refs: &'static str,
    /// Foreign-key fields on each target
    pub fields: &'static [&'static str],
}

/// Standard expansions for feed-like payloads
pub const FEED_RULES: &[ExpansionRule] = &[
    ExpansionRule {
        targets: "posts",
        refs: "users",
        fields: &["creator"],
    },
    ExpansionRule {
        targets: "posts",
        refs: "postRefs",
        fields: &["parent", "root"],
    },
    ExpansionRule {
        targets: "posts",
        refs: "urls",
        fields: &["links"],
    },
];

/// Link expansion for comment listings
pub const COMMENT_LINK_RULES: &[ExpansionRule] = &[ExpansionRule {
    targets: "comments",
    refs: "urls",
    fields: &["links"],
}];
