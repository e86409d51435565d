//! # Message Encoder
//!
//! Turns a field-value set into a configuration message plus diagnostics.
//! Bad fields are dropped and reported; the encode itself never fails.

use tracing::{debug, warn};

use super::catalog::{Catalog, FieldSpec};
use super::diagnostics::{ConsistencyWarning, Diagnostics};
use super::flags;
use super::message::ConfigMessage;
use super::scalar::{self, EncodedField};
use super::value::{FieldValue, FieldValues, RawValue};
use crate::error::EncodeError;

/// Result of one encode: whatever encoded, and what went wrong
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOutcome {
    /// Framed message with checksum
    pub message: ConfigMessage,

    /// Fields that made it into the message, in catalog order
    pub fields: Vec<EncodedField>,

    /// Problems found, in catalog order then unknown names
    pub diagnostics: Diagnostics,
}

impl EncodeOutcome {
    /// Hex form of the message
    pub fn hex(&self) -> String {
        self.message.to_hex()
    }

    /// Whether every included field made it into the message
    pub fn is_complete(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Input entries for one field, ignoring case
///
/// The exact-case entry wins when there is one, otherwise the first in
/// name order. Every other case variant is returned as a duplicate.
fn find_value<'a>(values: &'a FieldValues, spec: &FieldSpec) -> (Option<&'a FieldValue>, Vec<&'a str>) {
    let mut matches: Vec<(&'a String, &'a FieldValue)> = values
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(spec.name))
        .collect();
    if matches.is_empty() {
        return (None, Vec::new());
    }

    let chosen = matches.iter().position(|(name, _)| name.as_str() == spec.name).unwrap_or(0);
    let (_, value) = matches.remove(chosen);
    (Some(value), matches.into_iter().map(|(name, _)| name.as_str()).collect())
}

/// Check a composite left out of the message for bits that were set anyway
///
/// Flag names the composite does not know are skipped, so the known ones
/// still get reported.
fn check_excluded_composite(spec: &FieldSpec, value: &FieldValue) -> Option<ConsistencyWarning> {
    let raw = value.value.as_ref()?;
    let composite = flags::composite_for(spec.tag)?;

    let bits = match raw {
        RawValue::Flags(names) => composite.compose_known_names(names.as_slice()),
        other => scalar::composite_bits(spec, other).ok()?,
    };
    if bits == 0 {
        return None;
    }

    Some(ConsistencyWarning {
        field: spec.name.to_string(),
        set_flags: composite.flag_names(bits).into_iter().map(str::to_string).collect(),
    })
}

/// Encode a field-value set into a configuration message
///
/// Fields are visited in catalog order, so the message layout does not
/// depend on input order. Each included field is encoded on its own; a
/// parse or range error drops that field only. A composite that is not
/// included but has bits set is dropped with a warning.
///
/// # Arguments
///
/// * `catalog` - Field catalog
/// * `values` - Field name → include flag and raw value
///
/// # Returns
///
/// * `EncodeOutcome` - Message built from the fields that encoded, plus diagnostics
///
/// # Examples
///
/// ```
/// use tracker_config::codec::catalog::Catalog;
/// use tracker_config::codec::encoder::encode_config;
/// use tracker_config::codec::value::{FieldValue, FieldValues};
///
/// let catalog = Catalog::standard().unwrap();
/// let mut values = FieldValues::new();
/// values.insert("HIPRESS".to_string(), FieldValue::included(1000i64));
///
/// let outcome = encode_config(&catalog, &values);
/// assert!(outcome.is_complete());
/// assert!(outcome.hex().starts_with("0234e80303"));
/// ```
pub fn encode_config(catalog: &Catalog, values: &FieldValues) -> EncodeOutcome {
    let mut fields = Vec::new();
    let mut diagnostics = Diagnostics::new();

    for spec in catalog.iter() {
        let (Some(value), duplicates) = find_value(values, spec) else {
            continue;
        };

        if !value.include {
            if spec.kind.is_composite() {
                if let Some(warning) = check_excluded_composite(spec, value) {
                    warn!("{}", warning);
                    diagnostics.push_warning(warning);
                }
            }
        } else {
            match scalar::encode(spec, value.value.as_ref()) {
                Ok(field) => {
                    debug!("{}: {}", spec, hex::encode(&field.payload));
                    fields.push(field);
                }
                Err(err) => {
                    warn!("Dropping field: {}", err);
                    diagnostics.push_error(err);
                }
            }
        }

        for name in duplicates {
            let err = EncodeError::DuplicateField {
                field: name.to_string(),
                canonical: spec.name.to_string(),
            };
            warn!("Dropping field: {}", err);
            diagnostics.push_error(err);
        }
    }

    for name in values.keys().filter(|name| catalog.lookup(name).is_none()) {
        let err = EncodeError::UnknownField { field: name.clone() };
        warn!("Dropping field: {}", err);
        diagnostics.push_error(err);
    }

    let message = ConfigMessage::new(&fields);
    debug!(
        "Encoded {} fields into {} bytes ({} errors, {} warnings)",
        fields.len(),
        message.len(),
        diagnostics.error_count(),
        diagnostics.warning_count()
    );

    EncodeOutcome { message, fields, diagnostics }
}
