//! # Field Values
//!
//! Raw field values as supplied by a form or an input file, before any
//! encoding. A [`FieldValues`] set is created per encode, consumed once,
//! and carries no state between encodes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A raw value as entered by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Whole number
    Integer(i64),
    /// Decimal number
    Decimal(f64),
    /// Text, parsed according to the field's kind
    Text(String),
    /// Flag names for a composite field
    Flags(Vec<String>),
}

impl RawValue {
    /// Textual form used for parsing and diagnostics
    ///
    /// Decimals use the shortest representation that round-trips, so
    /// `89.9999999` stays `"89.9999999"` rather than picking up binary noise.
    pub fn as_text(&self) -> String {
        match self {
            RawValue::Integer(v) => v.to_string(),
            RawValue::Decimal(v) => v.to_string(),
            RawValue::Text(s) => s.trim().to_string(),
            RawValue::Flags(names) => names.join(","),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Flags(names) => write!(f, "[{}]", names.join(", ")),
            other => f.write_str(&other.as_text()),
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Integer(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Decimal(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<Vec<&str>> for RawValue {
    fn from(v: Vec<&str>) -> Self {
        RawValue::Flags(v.into_iter().map(str::to_string).collect())
    }
}

/// One field's include flag and raw value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Whether the field goes into the message
    pub include: bool,

    /// Raw value; absent for fields without a payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RawValue>,
}

impl FieldValue {
    /// Included field with a value
    pub fn included(value: impl Into<RawValue>) -> Self {
        Self { include: true, value: Some(value.into()) }
    }

    /// Field present in the form but not included
    pub fn excluded(value: impl Into<RawValue>) -> Self {
        Self { include: false, value: Some(value.into()) }
    }

    /// Included field with no value (user functions)
    pub fn command() -> Self {
        Self { include: true, value: None }
    }
}

/// Field name → value, as supplied by the form
pub type FieldValues = BTreeMap<String, FieldValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_text_round_trips() {
        assert_eq!(RawValue::Decimal(-10.5).as_text(), "-10.5");
        assert_eq!(RawValue::Decimal(89.9999999).as_text(), "89.9999999");
        assert_eq!(RawValue::Decimal(85.0).as_text(), "85");
        assert_eq!(RawValue::Decimal(0.0000001).as_text(), "0.0000001");
    }

    #[test]
    fn test_text_is_trimmed() {
        assert_eq!(RawValue::from(" 1000 ").as_text(), "1000");
    }

    #[test]
    fn test_deserialize_toml_values() {
        let input: FieldValues = toml::from_str(
            r#"
[HIPRESS]
include = true
value = 1000

[LOTEMP]
include = true
value = -10.5

[FLAGS1]
include = false
value = ["BINARY", "DEST"]

[USERFUNC1]
include = true
"#,
        )
        .unwrap();

        assert_eq!(input["HIPRESS"], FieldValue::included(1000i64));
        assert_eq!(input["LOTEMP"], FieldValue::included(-10.5));
        assert_eq!(input["FLAGS1"], FieldValue::excluded(vec!["BINARY", "DEST"]));
        assert_eq!(input["USERFUNC1"], FieldValue::command());
    }

    #[test]
    fn test_deserialize_json_values() {
        let input: FieldValues = serde_json::from_str(
            r#"{"GEOFNUM": {"include": true, "value": "43"}, "DEST": {"include": true, "value": 4294967295}}"#,
        )
        .unwrap();

        assert_eq!(input["GEOFNUM"], FieldValue::included("43"));
        assert_eq!(input["DEST"], FieldValue::included(4_294_967_295i64));
    }

    #[test]
    fn test_include_is_required() {
        let result: Result<FieldValues, _> = toml::from_str("[DEST]\nvalue = 1\n");
        assert!(result.is_err());
    }
}
