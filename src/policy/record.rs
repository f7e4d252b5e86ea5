//! Persisted rule record.

use crate::store::Document;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of positional values a stored rule can carry.
pub const MAX_FIELDS: usize = 6;

/// Document key of the policy type tag.
pub const PTYPE_KEY: &str = "ptype";

/// Document keys of the positional rule values, in order.
pub const FIELD_KEYS: [&str; MAX_FIELDS] = ["v0", "v1", "v2", "v3", "v4", "v5"];

/// One stored policy rule: a type tag plus six fixed positional fields.
///
/// An empty field means "absent". Fields are expected to be filled from `v0`
/// onward without gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    /// Policy type, e.g. `p`, `p2` or `g`
    pub ptype: String,
    /// Field 0
    #[serde(default)]
    pub v0: String,
    /// Field 1
    #[serde(default)]
    pub v1: String,
    /// Field 2
    #[serde(default)]
    pub v2: String,
    /// Field 3
    #[serde(default)]
    pub v3: String,
    /// Field 4
    #[serde(default)]
    pub v4: String,
    /// Field 5
    #[serde(default)]
    pub v5: String,
}

impl RuleRecord {
    /// Create an empty record of the given type.
    pub fn new(ptype: impl Into<String>) -> Self {
        Self {
            ptype: ptype.into(),
            ..Default::default()
        }
    }

    /// The six positional fields in order.
    pub fn fields(&self) -> [&str; MAX_FIELDS] {
        [&self.v0, &self.v1, &self.v2, &self.v3, &self.v4, &self.v5]
    }

    /// Mutable access to the field at `index`, if it exists.
    pub fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        match index {
            0 => Some(&mut self.v0),
            1 => Some(&mut self.v1),
            2 => Some(&mut self.v2),
            3 => Some(&mut self.v3),
            4 => Some(&mut self.v4),
            5 => Some(&mut self.v5),
            _ => None,
        }
    }

    /// Convert to a store document carrying all seven keys.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(PTYPE_KEY.to_string(), Value::String(self.ptype.clone()));
        for (key, value) in FIELD_KEYS.iter().zip(self.fields()) {
            doc.insert(key.to_string(), Value::String(value.to_string()));
        }
        doc
    }

    /// Read a record back from a store document.
    ///
    /// Extra keys such as `_id` are ignored. Missing positional keys read as
    /// empty; a missing `ptype` or a non-string value is a decode error.
    pub fn from_document(doc: &Document) -> Result<Self> {
        serde_json::from_value(Value::Object(doc.clone())).map_err(|e| match document_id(doc) {
            Some(id) => Error::decode_document(e.to_string(), id),
            None => Error::decode(e.to_string()),
        })
    }
}

fn document_id(doc: &Document) -> Option<String> {
    match doc.get("_id")? {
        Value::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}
