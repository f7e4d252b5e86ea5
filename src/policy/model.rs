//! In-memory policy model consumed by the enforcement engine.

use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rules grouped by section (`p`, `g`, ...) and then by policy type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyModel {
    sections: BTreeMap<String, BTreeMap<String, Vec<Vec<String>>>>,
}

impl PolicyModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule under `(sec, ptype)`.
    pub fn add_rule(&mut self, sec: &str, ptype: &str, rule: Vec<String>) {
        self.sections
            .entry(sec.to_string())
            .or_default()
            .entry(ptype.to_string())
            .or_default()
            .push(rule);
    }

    /// Rules stored under `(sec, ptype)`.
    pub fn rules(&self, sec: &str, ptype: &str) -> &[Vec<String>] {
        self.sections
            .get(sec)
            .and_then(|types| types.get(ptype))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every policy type of a section with its rules.
    pub fn section<'a>(&'a self, sec: &str) -> impl Iterator<Item = (&'a str, &'a [Vec<String>])> + 'a {
        self.sections
            .get(sec)
            .into_iter()
            .flat_map(|types| types.iter().map(|(ptype, rules)| (ptype.as_str(), rules.as_slice())))
    }

    /// Every `(section, ptype, rule)` triple in the model.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &[String])> + '_ {
        self.sections.iter().flat_map(|(sec, types)| {
            types.iter().flat_map(move |(ptype, rules)| {
                rules
                    .iter()
                    .map(move |rule| (sec.as_str(), ptype.as_str(), rule.as_slice()))
            })
        })
    }

    /// Total number of rules.
    pub fn rule_count(&self) -> usize {
        self.sections
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Whether the model holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }

    /// Drop every rule.
    pub fn clear(&mut self) {
        self.sections.clear();
    }

    /// Parse casbin policy CSV: one rule per line, `ptype, v0, v1, ...`.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut model = Self::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split(',').map(str::trim);
            let ptype = tokens.next().unwrap_or_default();
            let sec = super::codec::section_of(ptype).ok_or_else(|| {
                Error::validation_field(format!("line {}: missing policy type", number + 1), "ptype")
            })?;

            model.add_rule(sec, ptype, tokens.map(str::to_string).collect());
        }

        Ok(model)
    }

    /// Render as casbin policy CSV.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for (_, ptype, rule) in self.iter() {
            out.push_str(ptype);
            for value in rule {
                out.push_str(", ");
                out.push_str(value);
            }
            out.push('\n');
        }
        out
    }
}
