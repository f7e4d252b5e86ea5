//! Mapping between in-memory rule tuples and stored rule records.
//!
//! A stored record has six fixed positional fields where an empty string
//! stands for "absent". Decoding stops at the first empty field, so a record
//! with a hole (an empty field followed by a non-empty one) loses everything
//! after the hole. This matches how existing rule collections are read and
//! is kept as-is.

use super::model::PolicyModel;
use super::record::{RuleRecord, MAX_FIELDS};
use crate::store::Document;
use crate::{Error, Result};

/// Section of a policy type: its first character (`"p2"` belongs to `"p"`).
pub fn section_of(ptype: &str) -> Option<&str> {
    let first = ptype.chars().next()?;
    Some(&ptype[..first.len_utf8()])
}

/// Encode a rule tuple into a record, filling fields from `v0` onward.
///
/// Values are stored verbatim, empty strings included. Rules longer than
/// [`MAX_FIELDS`] cannot be stored.
pub fn encode_rule<S: AsRef<str>>(ptype: &str, rule: &[S]) -> Result<RuleRecord> {
    if rule.len() > MAX_FIELDS {
        return Err(Error::validation_field(
            format!(
                "rule of type {} has {} values, at most {} can be stored",
                ptype,
                rule.len(),
                MAX_FIELDS
            ),
            "rule",
        ));
    }

    let mut record = RuleRecord::new(ptype);
    for (index, value) in rule.iter().enumerate() {
        if let Some(field) = record.field_mut(index) {
            *field = value.as_ref().to_string();
        }
    }
    Ok(record)
}

/// Decode a record into a rule tuple, stopping at the first empty field.
pub fn decode_record(record: &RuleRecord) -> Vec<String> {
    record
        .fields()
        .into_iter()
        .take_while(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decode a record and append it to the model under `(section, ptype)`.
pub fn load_record(record: &RuleRecord, model: &mut PolicyModel) -> Result<()> {
    let sec = section_of(&record.ptype)
        .ok_or_else(|| Error::decode("record has an empty policy type"))?;
    model.add_rule(sec, &record.ptype, decode_record(record));
    Ok(())
}

/// Read a raw store document into the model.
pub fn load_document(doc: &Document, model: &mut PolicyModel) -> Result<()> {
    let record = RuleRecord::from_document(doc)?;
    load_record(&record, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_section_of() {
        assert_eq!(section_of("p"), Some("p"));
        assert_eq!(section_of("p2"), Some("p"));
        assert_eq!(section_of("g"), Some("g"));
        assert_eq!(section_of(""), None);
    }

    #[test]
    fn test_encode_positions() {
        let record = encode_rule("p", &["alice", "data1", "read"]).unwrap();
        assert_eq!(record.ptype, "p");
        assert_eq!(record.fields(), ["alice", "data1", "read", "", "", ""]);
    }

    #[test]
    fn test_encode_empty_and_full_rules() {
        let empty: [&str; 0] = [];
        assert_eq!(encode_rule("p", &empty).unwrap(), RuleRecord::new("p"));

        let full = encode_rule("p", &["a", "b", "c", "d", "e", "f"]).unwrap();
        assert_eq!(full.v5, "f");
    }

    #[test]
    fn test_encode_rejects_seven_values() {
        let err = encode_rule("p", &["a", "b", "c", "d", "e", "f", "g"]).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_encode_keeps_literal_empty_value() {
        let record = encode_rule("p", &["alice", ""]).unwrap();
        assert_eq!(record.v0, "alice");
        assert_eq!(record.v1, "");
    }

    #[test]
    fn test_decode_stops_at_hole() {
        let mut record = RuleRecord::new("p");
        record.v0 = "alice".to_string();
        record.v2 = "read".to_string();

        assert_eq!(decode_record(&record), vec!["alice"]);
    }

    #[test]
    fn test_decode_empty_first_field() {
        let mut record = RuleRecord::new("p");
        record.v1 = "data1".to_string();
        assert!(decode_record(&record).is_empty());
    }

    #[test]
    fn test_load_record_uses_section_of_type() {
        let mut model = PolicyModel::new();
        load_record(&encode_rule("p2", &["bob", "data2"]).unwrap(), &mut model).unwrap();

        assert_eq!(model.rules("p", "p2"), &[vec!["bob", "data2"]]);
    }

    #[test]
    fn test_load_record_rejects_empty_type() {
        let mut model = PolicyModel::new();
        let err = load_record(&RuleRecord::new(""), &mut model).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(model.is_empty());
    }

    fn dense_rule() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z0-9_:/*]{1,12}", 0..=MAX_FIELDS)
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(ptype in "[pg][0-9]?", rule in dense_rule()) {
            let record = encode_rule(&ptype, &rule).unwrap();
            prop_assert_eq!(decode_record(&record), rule);
        }

        #[test]
        fn prop_encode_never_leaves_holes(rule in dense_rule()) {
            let record = encode_rule("p", &rule).unwrap();
            let fields = record.fields();
            for index in 1..MAX_FIELDS {
                prop_assert!(fields[index].is_empty() || !fields[index - 1].is_empty());
            }
        }
    }
}
