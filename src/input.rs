//! # Field-Value Input
//!
//! Reads the field-value set for an encode from a TOML or JSON file, and
//! generates a template listing every field with its factory default.
//!
//! ## File Format
//!
//! ```toml
//! [HIPRESS]
//! include = true
//! value = 1000
//!
//! [FLAGS1]
//! include = true
//! value = ["BINARY", "DEST"]
//!
//! [USERFUNC1]
//! include = true
//! ```

use std::fs;
use std::path::Path;

use crate::codec::catalog::{Catalog, EncodingKind, FieldSpec};
use crate::codec::flags;
use crate::codec::value::{FieldValue, FieldValues, RawValue};
use crate::error::{Result, TrackerConfigError};

/// Load a field-value set, picking the format from the file extension
///
/// `.json` files are read as JSON; anything else as TOML.
///
/// # Errors
///
/// Returns error if the file cannot be read or does not parse
pub fn load_values<P: AsRef<Path>>(path: P) -> Result<FieldValues> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(serde_json::from_str(&contents)?)
    } else {
        parse_toml(&contents)
            .map_err(|e| TrackerConfigError::Input(format!("{}: {}", path.display(), e)))
    }
}

/// Parse a TOML field-value set
pub fn parse_toml(contents: &str) -> std::result::Result<FieldValues, toml::de::Error> {
    toml::from_str(contents)
}

/// Factory default of a field as a raw value
fn default_value(spec: &FieldSpec) -> Option<RawValue> {
    match spec.kind {
        EncodingKind::Command => None,
        EncodingKind::RawFlagByte | EncodingKind::RawFlagBlock => {
            let composite = flags::composite_for(spec.tag)?;
            Some(RawValue::Flags(composite.defaults.iter().map(|s| s.to_string()).collect()))
        }
        EncodingKind::ScaledUnsignedInt | EncodingKind::ScaledSignedInt => {
            Some(RawValue::Text(spec.format_value(spec.default)))
        }
        _ => Some(RawValue::Integer(spec.default)),
    }
}

/// Every catalog field with its factory default, none included
pub fn template(catalog: &Catalog) -> FieldValues {
    catalog
        .iter()
        .map(|spec| {
            let value = FieldValue { include: false, value: default_value(spec) };
            (spec.name.to_string(), value)
        })
        .collect()
}

/// Render the template as TOML, one commented table per field in catalog order
///
/// # Errors
///
/// Returns error if a value cannot be serialised
pub fn template_toml(catalog: &Catalog) -> Result<String> {
    let values = template(catalog);
    let mut out = String::new();

    for spec in catalog.iter() {
        let Some(value) = values.get(spec.name) else {
            continue;
        };
        let body = toml::to_string(value)
            .map_err(|e| TrackerConfigError::Input(format!("{}: {}", spec.name, e)))?;

        out.push_str(&format!("# {} (0x{:02x})", spec.description, spec.tag));
        if !spec.kind.is_composite() && spec.kind != EncodingKind::Command {
            out.push_str(&format!(", range {}", spec.range_text()));
        }
        out.push('\n');
        out.push_str(&format!("[{}]\n{}\n", spec.name, body));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_config;
    use std::io::Write;
    use tempfile::Builder;

    fn catalog() -> Catalog {
        Catalog::standard().unwrap()
    }

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_toml() {
        let file = write_temp(
            ".toml",
            r#"
[HIPRESS]
include = true
value = 1000

[LOTEMP]
include = true
value = "-10.5"
"#,
        );
        let values = load_values(file.path()).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values["LOTEMP"], FieldValue::included("-10.5"));
    }

    #[test]
    fn test_load_json() {
        let file = write_temp(".json", r#"{"HIPRESS": {"include": true, "value": 1000}}"#);
        let values = load_values(file.path()).unwrap();
        assert_eq!(values["HIPRESS"], FieldValue::included(1000i64));
    }

    #[test]
    fn test_load_bad_toml_names_file() {
        let file = write_temp(".toml", "[HIPRESS]\nvalue = 1000\n");
        match load_values(file.path()) {
            Err(TrackerConfigError::Input(msg)) => assert!(msg.contains("include")),
            other => panic!("Expected Input error, got: {:?}", other),
        }
    }

    #[test]
    fn test_load_bad_json() {
        let file = write_temp(".json", "{not json");
        assert!(matches!(load_values(file.path()), Err(TrackerConfigError::Json(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(load_values("/nonexistent/values.toml"), Err(TrackerConfigError::Io(_))));
    }

    #[test]
    fn test_demo_file_encodes_cleanly() {
        let values = load_values(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/alarms.toml")).unwrap();
        let outcome = encode_config(&catalog(), &values);

        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics.messages());
        let tags: Vec<u8> = outcome.fields.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![0x30, 0x31, 0x33, 0x34, 0x37, 0x49]);
    }

    #[test]
    fn test_template_covers_catalog() {
        let values = template(&catalog());
        assert_eq!(values.len(), catalog().len());
        assert!(values.values().all(|v| !v.include));

        assert_eq!(values["WAKEINT"].value, Some(RawValue::Integer(60)));
        assert_eq!(values["LOWBATT"].value, Some(RawValue::Text("3.50".to_string())));
        assert_eq!(values["LOTEMP"].value, Some(RawValue::Text("-40.00".to_string())));
        assert_eq!(values["USERFUNC1"].value, None);
        assert_eq!(
            values["MOFIELDS"].value,
            Some(RawValue::from(vec!["DATETIME", "LAT", "LON", "ALT"]))
        );
    }

    #[test]
    fn test_template_defaults_encode_cleanly() {
        let mut values = template(&catalog());
        for value in values.values_mut() {
            value.include = true;
        }

        let outcome = encode_config(&catalog(), &values);
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics.messages());
        assert_eq!(outcome.fields.len(), catalog().len());
    }

    #[test]
    fn test_template_toml_round_trips() {
        let text = template_toml(&catalog()).unwrap();
        assert!(text.contains("[GEOF1LAT]"));
        assert!(text.contains("range [-90.0000000, 90.0000000)"));

        let parsed = parse_toml(&text).unwrap();
        assert_eq!(parsed, template(&catalog()));
    }

    #[test]
    fn test_excluded_template_sends_nothing_but_warns_on_presence_mask() {
        let outcome = encode_config(&catalog(), &template(&catalog()));
        assert!(outcome.fields.is_empty());
        // MOFIELDS defaults have bits set; FLAGS1/FLAGS2 default to none
        assert_eq!(outcome.diagnostics.warning_count(), 1);
        assert!(!outcome.diagnostics.has_errors());
    }
}
