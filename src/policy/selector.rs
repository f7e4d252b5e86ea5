//! Field-equality selectors over stored rule records.

use super::record::{RuleRecord, FIELD_KEYS, PTYPE_KEY};
use crate::store::Document;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A conjunction of `key == value` constraints on stored documents.
///
/// A document matches when every key of the selector is present in the
/// document as a string equal to the required value. The empty selector
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector {
    constraints: BTreeMap<String, String>,
}

impl Selector {
    /// Create a selector with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace a constraint.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.constraints.insert(key.into(), value.into());
    }

    /// Required value for `key`, if constrained.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.constraints.get(key).map(String::as_str)
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether the selector matches every document.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Iterate over `(key, value)` constraints in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.constraints
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Selector requiring equality on the type tag and all six fields,
    /// empty trailing fields included.
    pub fn for_rule(record: &RuleRecord) -> Self {
        let mut selector = Self::new().with(PTYPE_KEY, record.ptype.as_str());
        for (key, value) in FIELD_KEYS.iter().zip(record.fields()) {
            selector.insert(*key, value);
        }
        selector
    }

    /// Selector for removing or loading a subset of rules of one type.
    ///
    /// `field_values[0]` lines up with stored field `field_index`. A stored
    /// field is constrained only when it falls inside that window and the
    /// supplied value is non-empty; every other field matches anything.
    pub fn for_filtered_removal<S: AsRef<str>>(
        ptype: &str,
        field_index: i32,
        field_values: &[S],
    ) -> Self {
        let mut selector = Self::new().with(PTYPE_KEY, ptype);
        let start = i64::from(field_index);
        let end = start + field_values.len() as i64;

        for (position, key) in FIELD_KEYS.iter().enumerate() {
            let position = position as i64;
            if position < start || position >= end {
                continue;
            }
            let value = field_values[(position - start) as usize].as_ref();
            if !value.is_empty() {
                selector.insert(*key, value);
            }
        }

        selector
    }

    /// Check a document against every constraint.
    pub fn matches(&self, doc: &Document) -> bool {
        self.constraints.iter().all(|(key, expected)| match doc.get(key) {
            Some(Value::String(actual)) => actual == expected,
            _ => false,
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Selector {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut selector = Self::new();
        for (key, value) in iter {
            selector.insert(key, value);
        }
        selector
    }
}
