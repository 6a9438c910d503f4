// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Value conditions.
//!
//! A `Condition` is tested against an extracted value (a state value or
//! an attribute) rather than against the whole event. Absence is
//! modeled with `Option`: `None` is a missing value (entity or attribute
//! not present), which is distinct from a present JSON null.

use hassette_core::glob_match;
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum Condition {
    /// Structural equality with a JSON value. `Equals(Value::Null)`
    /// requires a present null, not absence.
    Equals(Value),
    /// Shell-style glob over string values.
    Glob(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    Regex(regex::Regex),
    /// The value exists at all.
    Present,
    /// The value does not exist.
    Missing,
}

impl Condition {
    /// Compile a regex condition. Invalid patterns are a configuration
    /// error at subscription time, not at match time.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex(regex::Regex::new(pattern)?))
    }

    /// Equality, auto-upgrading glob-looking strings to glob matches.
    pub fn value(value: impl Into<Value>) -> Self {
        let value = value.into();
        match value {
            Value::String(s) if hassette_core::is_glob(&s) => Self::Glob(s),
            other => Self::Equals(other),
        }
    }

    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Condition::Present => value.is_some(),
            Condition::Missing => value.is_none(),
            Condition::Equals(expected) => value == Some(expected),
            Condition::Glob(pattern) => {
                matches!(value, Some(Value::String(s)) if glob_match(pattern, s))
            }
            Condition::StartsWith(prefix) => {
                matches!(value, Some(Value::String(s)) if s.starts_with(prefix))
            }
            Condition::EndsWith(suffix) => {
                matches!(value, Some(Value::String(s)) if s.ends_with(suffix))
            }
            Condition::Contains(substring) => {
                matches!(value, Some(Value::String(s)) if s.contains(substring))
            }
            Condition::Regex(re) => {
                matches!(value, Some(Value::String(s)) if re.is_match(s))
            }
        }
    }
}

#[cfg(test)]
#[path = "conditions_tests.rs"]
mod tests;
