//! Policy rule representations.
//!
//! This module covers the stored record shape, the codec between records and
//! in-memory rule tuples, the selectors used to pick subsets of stored rules,
//! and the policy model that rules are loaded into.

pub mod codec;
mod model;
mod record;
mod selector;

pub use codec::{decode_record, encode_rule, load_document, load_record, section_of};
pub use model::PolicyModel;
pub use record::{RuleRecord, FIELD_KEYS, MAX_FIELDS, PTYPE_KEY};
pub use selector::Selector;

/// Section holding permission rules.
pub const POLICY_SECTION: &str = "p";

/// Section holding grouping (role) rules.
pub const GROUPING_SECTION: &str = "g";
