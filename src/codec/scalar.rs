//! # Scalar Encoder
//!
//! Encodes one field's raw value into its tagged payload: parse, range
//! check, scale, truncate, then lay out little-endian at the field's width.
//!
//! Decimal inputs are scaled by moving the decimal point rather than by
//! floating-point multiplication, so `-10.5 × 100` is exactly `-1050`.
//! Digits beyond the scale are truncated toward zero, but the range check
//! still sees them: `-40.001` is below `-40.00` even though it truncates to
//! `-4000`.

use std::cmp::Ordering;

use bytes::{BufMut, Bytes, BytesMut};

use super::catalog::{EncodingKind, FieldSpec};
use super::flags;
use super::value::RawValue;
use crate::error::EncodeError;

/// Largest digit allowed in either half of a packed nibble pair
pub const NIBBLE_DIGIT_MAX: i128 = 4;

/// A field ready for the message: tag byte plus payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedField {
    pub tag: u8,
    pub payload: Bytes,
}

impl EncodedField {
    /// Encoded length on the wire (tag + payload)
    pub fn wire_len(&self) -> usize {
        1 + self.payload.len()
    }
}

/// Decimal value moved into wire units
///
/// `truncated` is the scaled value with excess digits dropped; `remainder`
/// records which side of `truncated` the exact value lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scaled {
    truncated: i128,
    remainder: Ordering,
}

impl Scaled {
    /// Compare the exact value against an integer bound
    fn cmp_bound(&self, bound: i64) -> Ordering {
        self.truncated.cmp(&i128::from(bound)).then(self.remainder)
    }

    fn is_exact(&self) -> bool {
        self.remainder == Ordering::Equal
    }
}

/// Why a raw value did not scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScaleError {
    /// Not a plain decimal
    Malformed,
    /// Well-formed, but too large for 128 bits once scaled
    Overflow,
}

/// Parse a plain decimal (`-12`, `3.25`, `.5`, `+7.`) scaled by `10^decimals`
///
/// Exponents, `NaN` and `inf` are [`ScaleError::Malformed`].
fn parse_scaled(text: &str, decimals: u32) -> Result<Scaled, ScaleError> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(ScaleError::Malformed);
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(ScaleError::Malformed);
    }

    let push_digit = |magnitude: i128, digit: u8| {
        magnitude
            .checked_mul(10)
            .and_then(|m| m.checked_add(i128::from(digit)))
            .ok_or(ScaleError::Overflow)
    };

    let mut magnitude: i128 = 0;
    for b in int_part.bytes() {
        magnitude = push_digit(magnitude, b - b'0')?;
    }

    let mut frac = frac_part.bytes();
    for _ in 0..decimals {
        let digit = frac.next().map_or(0, |b| b - b'0');
        magnitude = push_digit(magnitude, digit)?;
    }
    let inexact = frac.any(|b| b != b'0');

    let (truncated, remainder) = match (negative, inexact) {
        (false, false) => (magnitude, Ordering::Equal),
        (false, true) => (magnitude, Ordering::Greater),
        (true, false) => (-magnitude, Ordering::Equal),
        (true, true) => (-magnitude, Ordering::Less),
    };

    Ok(Scaled { truncated, remainder })
}

fn parse_error(spec: &FieldSpec, value: String, reason: &str) -> EncodeError {
    EncodeError::Parse {
        field: spec.name.to_string(),
        value,
        reason: reason.to_string(),
    }
}

fn range_error(spec: &FieldSpec, value: String) -> EncodeError {
    EncodeError::Range {
        field: spec.name.to_string(),
        value,
        allowed: spec.range_text(),
    }
}

/// Parse a numeric raw value and check it against the field's range
fn parse_in_range(spec: &FieldSpec, raw: &RawValue) -> Result<i128, EncodeError> {
    let text = match raw {
        RawValue::Flags(_) => return Err(parse_error(spec, raw.to_string(), "expected a number, found a flag list")),
        other => other.as_text(),
    };

    let scaled = match parse_scaled(&text, spec.decimals()) {
        Ok(scaled) => scaled,
        Err(ScaleError::Malformed) => return Err(parse_error(spec, text, "not a decimal number")),
        Err(ScaleError::Overflow) => return Err(range_error(spec, text)),
    };

    if !spec.kind.is_scaled() && !scaled.is_exact() {
        return Err(parse_error(spec, text, "expected a whole number"));
    }

    let above_min = scaled.cmp_bound(spec.range.min) != Ordering::Less;
    let below_max = if spec.range.max_inclusive {
        scaled.cmp_bound(spec.range.max) != Ordering::Greater
    } else {
        scaled.cmp_bound(spec.range.max) == Ordering::Less
    };
    if !above_min || !below_max {
        return Err(range_error(spec, text));
    }

    Ok(scaled.truncated)
}

/// Write an in-range value little-endian at the field's width
fn put_integer(spec: &FieldSpec, value: i128, buf: &mut BytesMut) -> Result<(), EncodeError> {
    let overflow = || range_error(spec, value.to_string());

    match (spec.size, spec.signed) {
        (1, false) => buf.put_u8(u8::try_from(value).map_err(|_| overflow())?),
        (1, true) => buf.put_i8(i8::try_from(value).map_err(|_| overflow())?),
        (2, false) => buf.put_u16_le(u16::try_from(value).map_err(|_| overflow())?),
        (2, true) => buf.put_i16_le(i16::try_from(value).map_err(|_| overflow())?),
        (4, false) => buf.put_u32_le(u32::try_from(value).map_err(|_| overflow())?),
        (4, true) => buf.put_i32_le(i32::try_from(value).map_err(|_| overflow())?),
        _ => return Err(overflow()),
    }

    Ok(())
}

/// Split `high*10 + low` and repack as `high*16 + low`
fn pack_nibbles(spec: &FieldSpec, value: i128, text: &str) -> Result<u8, EncodeError> {
    let (high, low) = (value / 10, value % 10);

    for (part, digit) in [("count", high), ("confidence", low)] {
        if !(0..=NIBBLE_DIGIT_MAX).contains(&digit) {
            return Err(EncodeError::Range {
                field: spec.name.to_string(),
                value: text.to_string(),
                allowed: format!("{} digit {} outside [0, {}]", part, digit, NIBBLE_DIGIT_MAX),
            });
        }
    }

    u8::try_from(high * 16 + low).map_err(|_| range_error(spec, text.to_string()))
}

/// Compose a flag field's value from names or an already-composed value
fn composite_value(spec: &FieldSpec, raw: &RawValue) -> Result<u128, EncodeError> {
    let composite = flags::composite_for(spec.tag)
        .ok_or_else(|| parse_error(spec, raw.to_string(), "field has no flag table"))?;

    let value = match (spec.kind, raw) {
        (_, RawValue::Flags(names)) => composite.compose_names(names.as_slice())?,
        (EncodingKind::RawFlagBlock, RawValue::Text(text)) => {
            let bytes = hex::decode(text.trim())
                .map_err(|_| parse_error(spec, text.clone(), "expected a hex string"))?;
            composite.from_bytes(&bytes).ok_or_else(|| {
                parse_error(
                    spec,
                    text.clone(),
                    &format!("expected {} hex digits", composite.width_bytes() * 2),
                )
            })?
        }
        (EncodingKind::RawFlagBlock, other) => {
            return Err(parse_error(spec, other.to_string(), "expected a flag list or hex string"))
        }
        (_, other) => {
            let value = parse_in_range(spec, other)?;
            u128::try_from(value).map_err(|_| range_error(spec, other.as_text()))?
        }
    };

    if value & !composite.valid_mask() != 0 {
        return Err(EncodeError::Range {
            field: spec.name.to_string(),
            value: format!("0x{:0width$x}", value, width = composite.width_bytes() * 2),
            allowed: format!("assigned bits 0x{:0width$x}", composite.valid_mask(), width = composite.width_bytes() * 2),
        });
    }

    Ok(value)
}

/// Compose a composite field's bits without encoding it
///
/// Used to detect set bits on a composite that is not included.
pub fn composite_bits(spec: &FieldSpec, raw: &RawValue) -> Result<u128, EncodeError> {
    composite_value(spec, raw)
}

/// Encode one field's raw value into its tagged representation
///
/// # Arguments
///
/// * `spec` - Catalog entry of the field
/// * `raw` - Raw value from the form; `None` when the form gave no value
///
/// # Errors
///
/// Returns [`EncodeError::Parse`] when the value has the wrong shape and
/// [`EncodeError::Range`] when it falls outside the field's range. The
/// caller drops the field and carries on with the rest of the message.
///
/// # Examples
///
/// ```
/// use tracker_config::codec::catalog::Catalog;
/// use tracker_config::codec::scalar::encode;
/// use tracker_config::codec::value::RawValue;
///
/// let catalog = Catalog::standard().unwrap();
/// let spec = catalog.lookup("LOTEMP").unwrap();
/// let field = encode(spec, Some(&RawValue::Decimal(-10.5))).unwrap();
/// assert_eq!(field.tag, 0x37);
/// assert_eq!(&field.payload[..], &(-1050i16).to_le_bytes()[..]);
/// ```
pub fn encode(spec: &FieldSpec, raw: Option<&RawValue>) -> Result<EncodedField, EncodeError> {
    let mut payload = BytesMut::with_capacity(usize::from(spec.size));

    if spec.kind == EncodingKind::Command {
        return Ok(EncodedField { tag: spec.tag, payload: payload.freeze() });
    }

    let raw = raw.ok_or_else(|| parse_error(spec, String::new(), "missing value"))?;

    match spec.kind {
        EncodingKind::UnsignedInt
        | EncodingKind::SignedInt
        | EncodingKind::ScaledUnsignedInt
        | EncodingKind::ScaledSignedInt => {
            let value = parse_in_range(spec, raw)?;
            put_integer(spec, value, &mut payload)?;
        }
        EncodingKind::PackedNibblePair => {
            let value = parse_in_range(spec, raw)?;
            payload.put_u8(pack_nibbles(spec, value, &raw.as_text())?);
        }
        EncodingKind::RawFlagByte | EncodingKind::RawFlagBlock => {
            let value = composite_value(spec, raw)?;
            let bytes = value.to_be_bytes();
            payload.put_slice(&bytes[bytes.len() - usize::from(spec.size)..]);
        }
        EncodingKind::Command => {}
    }

    Ok(EncodedField { tag: spec.tag, payload: payload.freeze() })
}
