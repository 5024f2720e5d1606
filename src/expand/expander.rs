//! Reference expander implementation

use super::types::{ExpandConfig, ExpansionRule, FEED_RULES};
use crate::error::{Error, Result};
use crate::types::{id_key, JsonObject, JsonValue, Record};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Records from one sibling array, keyed by id.
///
/// Borrowed from the response payload and dropped once expansion is done.
#[derive(Debug, Default)]
pub struct ReferenceSet<'a> {
    by_id: HashMap<String, &'a Record>,
}

impl<'a> ReferenceSet<'a> {
    /// Index `refs` by their `id` (or `_id`) key
    pub fn build(refs: &'a [Record]) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(refs.len());

        for (i, record) in refs.iter().enumerate() {
            let obj = record
                .as_object()
                .ok_or_else(|| Error::decode(format!("Expected object at {i} in reference array")))?;

            match record_id(obj) {
                Some(id) => {
                    by_id.insert(id, record);
                }
                None => warn!("Reference at {i} has no id; skipping"),
            }
        }

        Ok(Self { by_id })
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True if nothing was indexed
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Look up the record an id value points at
    pub fn resolve(&self, field: &str, id: &JsonValue) -> Result<&'a Record> {
        id_key(id)
            .and_then(|key| self.by_id.get(&key).copied())
            .ok_or_else(|| Error::dangling(field, render_id(id)))
    }

    fn link_field(&self, target: &mut JsonObject, field: &str) -> Result<()> {
        let Some(value) = target.get_mut(field) else {
            return Ok(());
        };

        match value {
            JsonValue::Null | JsonValue::Bool(false) => {}
            JsonValue::String(s) if s.is_empty() => {}
            JsonValue::Array(ids) => {
                for id in ids.iter_mut() {
                    *id = self.resolve(field, id)?.clone();
                }
            }
            single => {
                *single = self.resolve(field, single)?.clone();
            }
        }

        Ok(())
    }
}

/// Resolves foreign-key ids against sibling reference arrays.
///
/// A missing reference is always an error: silently dropping a broken link
/// would hide data corruption from everything downstream.
#[derive(Debug, Clone, Default)]
pub struct ReferenceExpander {
    config: ExpandConfig,
}

impl ReferenceExpander {
    /// Create an expander for the given field selection
    pub fn new(config: ExpandConfig) -> Self {
        Self { config }
    }

    /// Field selection in use
    pub fn config(&self) -> &ExpandConfig {
        &self.config
    }

    /// Replace enabled `fields` on every target with the records they reference.
    ///
    /// Arrays of ids are resolved element by element, keeping their order.
    pub fn expand(&self, targets: &mut [Record], refs: &[Record], fields: &[&str]) -> Result<()> {
        let refs = ReferenceSet::build(refs)?;
        let active: Vec<&str> = fields
            .iter()
            .copied()
            .filter(|field| self.config.is_enabled(field))
            .collect();

        for (i, target) in targets.iter_mut().enumerate() {
            let obj = target
                .as_object_mut()
                .ok_or_else(|| Error::decode(format!("Expected object at {i} in targets array")))?;

            for field in &active {
                refs.link_field(obj, field)?;
            }
        }

        Ok(())
    }

    /// Apply `rules` to a response payload and return the linked payload
    pub fn expand_payload(&self, mut payload: JsonValue, rules: &[ExpansionRule]) -> Result<JsonValue> {
        let Some(obj) = payload.as_object_mut() else {
            return Ok(payload);
        };

        for rule in rules {
            let mut targets = match obj.remove(rule.targets) {
                Some(JsonValue::Array(targets)) => targets,
                Some(other) => {
                    obj.insert(rule.targets.to_string(), other);
                    continue;
                }
                None => continue,
            };

            let result = match obj.get(rule.refs) {
                Some(JsonValue::Array(refs)) => self.expand(&mut targets, refs, rule.fields),
                _ => self.expand(&mut targets, &[], rule.fields),
            };

            obj.insert(rule.targets.to_string(), JsonValue::Array(targets));
            result?;
            debug!("Expanded {:?} on '{}' from '{}'", rule.fields, rule.targets, rule.refs);
        }

        Ok(payload)
    }

    /// Standard expansions for a feed-like payload: creator, parent/root and
    /// links on posts, each from its own sibling array
    pub fn expand_all(&self, payload: JsonValue) -> Result<JsonValue> {
        self.expand_payload(payload, FEED_RULES)
    }
}

fn record_id(obj: &JsonObject) -> Option<String> {
    ["id", "_id"]
        .iter()
        .filter_map(|key| obj.get(*key).and_then(id_key))
        .find(|id| !id.is_empty())
}

fn render_id(id: &JsonValue) -> String {
    match id {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
