//! # Field Catalog
//!
//! Static table of every configurable message field: tag byte, encoding
//! kind, valid range, scale factor and wire width.
//!
//! Catalog order is transmission order and is strictly ascending by tag.
//! The table is checked once when a [`Catalog`] is built; after that no
//! encode can hit a catalog error.

use std::collections::HashSet;
use std::fmt;

use super::flags;
use crate::error::CatalogError;

/// How a field's raw value becomes payload bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingKind {
    /// Plain unsigned integer
    UnsignedInt,
    /// Plain signed integer
    SignedInt,
    /// Decimal × scale, truncated to an unsigned integer
    ScaledUnsignedInt,
    /// Decimal × scale, truncated to a signed integer
    ScaledSignedInt,
    /// Two digits 0-4 entered as `high*10 + low`, sent as `high*16 + low`
    PackedNibblePair,
    /// Composed 8-bit flag field
    RawFlagByte,
    /// Composed multi-byte flag field
    RawFlagBlock,
    /// Tag with no payload
    Command,
}

impl EncodingKind {
    /// Whether the kind applies a scale factor
    pub fn is_scaled(self) -> bool {
        matches!(self, EncodingKind::ScaledUnsignedInt | EncodingKind::ScaledSignedInt)
    }

    /// Whether the kind is a composite bitfield
    pub fn is_composite(self) -> bool {
        matches!(self, EncodingKind::RawFlagByte | EncodingKind::RawFlagBlock)
    }
}

/// Valid interval of a field, in wire units (user value × scale)
///
/// The lower bound is always inclusive. Some fields use a half-open upper
/// bound (latitude `[-90, 90)`), others a closed one (pressure `[0, 1084]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRange {
    pub min: i64,
    pub max: i64,
    pub max_inclusive: bool,
}

impl ValueRange {
    /// `[min, max]`
    pub const fn closed(min: i64, max: i64) -> Self {
        Self { min, max, max_inclusive: true }
    }

    /// `[min, max)`
    pub const fn half_open(min: i64, max: i64) -> Self {
        Self { min, max, max_inclusive: false }
    }

    /// Largest value inside the range
    pub fn upper(&self) -> i64 {
        if self.max_inclusive {
            self.max
        } else {
            self.max - 1
        }
    }
}

/// Definition of one message field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name used in field-value input
    pub name: &'static str,

    /// Tag byte preceding the payload on the wire
    pub tag: u8,

    /// Encoding kind
    pub kind: EncodingKind,

    /// Valid range in wire units
    pub range: ValueRange,

    /// Multiplier applied before truncation (a power of ten)
    pub scale: u32,

    /// Payload width in bytes
    pub size: u8,

    /// Whether the payload is two's complement
    pub signed: bool,

    /// Factory default in wire units
    pub default: i64,

    /// Short description for listings
    pub description: &'static str,
}

impl FieldSpec {
    /// Number of decimal places kept by the scale factor
    pub fn decimals(&self) -> u32 {
        self.scale.checked_ilog10().unwrap_or(0)
    }

    /// Format a wire-unit value in user units
    pub fn format_value(&self, wire: i64) -> String {
        format_scaled(i128::from(wire), self.decimals())
    }

    /// Human-readable range in user units, e.g. `[-90.0000000, 90.0000000)`
    pub fn range_text(&self) -> String {
        format!(
            "[{}, {}{}",
            self.format_value(self.range.min),
            self.format_value(self.range.max),
            if self.range.max_inclusive { "]" } else { ")" }
        )
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.name, self.tag)
    }
}

/// Render a scaled integer with a decimal point `decimals` places from the right
pub fn format_scaled(value: i128, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let scale = 10i128.pow(decimals);
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    let scale = scale.unsigned_abs();
    format!(
        "{}{}.{:0width$}",
        sign,
        magnitude / scale,
        magnitude % scale,
        width = decimals as usize
    )
}

const DEG: u32 = 10_000_000;
const U16_MAX: i64 = u16::MAX as i64;
const U32_MAX: i64 = u32::MAX as i64;

const fn unsigned(name: &'static str, tag: u8, size: u8, range: ValueRange, default: i64, description: &'static str) -> FieldSpec {
    FieldSpec { name, tag, kind: EncodingKind::UnsignedInt, range, scale: 1, size, signed: false, default, description }
}

const fn scaled(name: &'static str, tag: u8, size: u8, signed: bool, scale: u32, range: ValueRange, default: i64, description: &'static str) -> FieldSpec {
    let kind = if signed { EncodingKind::ScaledSignedInt } else { EncodingKind::ScaledUnsignedInt };
    FieldSpec { name, tag, kind, range, scale, size, signed, default, description }
}

const fn flag_field(name: &'static str, tag: u8, size: u8, kind: EncodingKind, description: &'static str) -> FieldSpec {
    FieldSpec { name, tag, kind, range: ValueRange::closed(0, 0xff), scale: 1, size, signed: false, default: 0, description }
}

const fn command(name: &'static str, tag: u8, description: &'static str) -> FieldSpec {
    FieldSpec { name, tag, kind: EncodingKind::Command, range: ValueRange::closed(0, 0), scale: 1, size: 0, signed: false, default: 0, description }
}

const fn latitude(name: &'static str, tag: u8) -> FieldSpec {
    scaled(name, tag, 4, true, DEG, ValueRange::half_open(-90 * DEG as i64, 90 * DEG as i64), 0, "Geofence centre latitude (degrees)")
}

const fn longitude(name: &'static str, tag: u8) -> FieldSpec {
    scaled(name, tag, 4, true, DEG, ValueRange::half_open(-180 * DEG as i64, 180 * DEG as i64), 0, "Geofence centre longitude (degrees)")
}

const fn radius(name: &'static str, tag: u8) -> FieldSpec {
    scaled(name, tag, 4, false, 100, ValueRange::closed(0, U32_MAX), 0, "Geofence radius (m)")
}

/// Every configurable field, in transmission order
pub const FIELD_SPECS: &[FieldSpec] = &[
    flag_field("MOFIELDS", 0x30, 11, EncodingKind::RawFlagBlock, "Items reported in tracker messages"),
    flag_field("FLAGS1", 0x31, 1, EncodingKind::RawFlagByte, "Message options"),
    flag_field("FLAGS2", 0x32, 1, EncodingKind::RawFlagByte, "Alarm options"),
    unsigned("DEST", 0x33, 4, ValueRange::closed(0, U32_MAX), 0, "Destination modem serial number"),
    unsigned("HIPRESS", 0x34, 2, ValueRange::closed(0, 1084), 1084, "High pressure alarm (mbar)"),
    unsigned("LOPRESS", 0x35, 2, ValueRange::closed(0, 1084), 0, "Low pressure alarm (mbar)"),
    scaled("HITEMP", 0x36, 2, true, 100, ValueRange::closed(-4000, 8500), 8500, "High temperature alarm (C)"),
    scaled("LOTEMP", 0x37, 2, true, 100, ValueRange::closed(-4000, 8500), -4000, "Low temperature alarm (C)"),
    scaled("HIHUMID", 0x38, 2, false, 100, ValueRange::closed(0, 10000), 10000, "High humidity alarm (%RH)"),
    scaled("LOHUMID", 0x39, 2, false, 100, ValueRange::closed(0, 10000), 0, "Low humidity alarm (%RH)"),
    FieldSpec {
        name: "GEOFNUM",
        tag: 0x3a,
        kind: EncodingKind::PackedNibblePair,
        range: ValueRange::closed(0, 44),
        scale: 1,
        size: 1,
        signed: false,
        default: 0,
        description: "Geofence count (tens) and confidence (units)",
    },
    latitude("GEOF1LAT", 0x3b),
    longitude("GEOF1LON", 0x3c),
    radius("GEOF1RAD", 0x3d),
    latitude("GEOF2LAT", 0x3e),
    longitude("GEOF2LON", 0x3f),
    radius("GEOF2RAD", 0x40),
    latitude("GEOF3LAT", 0x41),
    longitude("GEOF3LON", 0x42),
    radius("GEOF3RAD", 0x43),
    latitude("GEOF4LAT", 0x44),
    longitude("GEOF4LON", 0x45),
    radius("GEOF4RAD", 0x46),
    unsigned("WAKEINT", 0x47, 2, ValueRange::closed(1, U16_MAX), 60, "Wake-up interval (s)"),
    unsigned("ALARMINT", 0x48, 2, ValueRange::closed(1, U16_MAX), 5, "Alarm transmit interval (min)"),
    unsigned("TXINT", 0x49, 2, ValueRange::closed(1, U16_MAX), 5, "Transmit interval (min)"),
    scaled("LOWBATT", 0x4a, 2, false, 100, ValueRange::closed(0, 550), 350, "Low battery alarm (V)"),
    unsigned("DYNMODEL", 0x4b, 1, ValueRange::closed(0, 10), 0, "GNSS dynamic platform model"),
    command("USERFUNC1", 0x50, "Execute user function 1"),
    command("USERFUNC2", 0x51, "Execute user function 2"),
    command("USERFUNC3", 0x52, "Execute user function 3"),
    command("USERFUNC4", 0x53, "Execute user function 4"),
    unsigned("USERFUNC5", 0x54, 2, ValueRange::closed(0, U16_MAX), 0, "Execute user function 5 with a 16-bit value"),
    unsigned("USERFUNC6", 0x55, 2, ValueRange::closed(0, U16_MAX), 0, "Execute user function 6 with a 16-bit value"),
    unsigned("USERFUNC7", 0x56, 4, ValueRange::closed(0, U32_MAX), 0, "Execute user function 7 with a 32-bit value"),
    unsigned("USERFUNC8", 0x57, 4, ValueRange::closed(0, U32_MAX), 0, "Execute user function 8 with a 32-bit value"),
];

/// Validated, read-only field catalog
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    specs: &'static [FieldSpec],
}

impl Catalog {
    /// Build a catalog from a static table
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on duplicate tags or names, tags out of
    /// ascending order, or a spec whose scale, range or width disagree.
    pub fn new(specs: &'static [FieldSpec]) -> Result<Self, CatalogError> {
        let mut names = HashSet::new();

        for (i, spec) in specs.iter().enumerate() {
            if !names.insert(spec.name.to_ascii_uppercase()) {
                return Err(CatalogError::DuplicateName(spec.name));
            }

            if let Some(first) = specs[..i].iter().find(|s| s.tag == spec.tag) {
                return Err(CatalogError::DuplicateTag {
                    tag: spec.tag,
                    first: first.name,
                    second: spec.name,
                });
            }

            if i > 0 && specs[i - 1].tag > spec.tag {
                return Err(CatalogError::OutOfOrder { tag: spec.tag, name: spec.name });
            }

            validate_spec(spec)?;
        }

        Ok(Self { specs })
    }

    /// The tracker's standard catalog
    pub fn standard() -> Result<Self, CatalogError> {
        Self::new(FIELD_SPECS)
    }

    /// Look up a field by name (case-insensitive)
    pub fn lookup(&self, name: &str) -> Option<&'static FieldSpec> {
        self.specs.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Look up a field by tag byte
    pub fn by_tag(&self, tag: u8) -> Option<&'static FieldSpec> {
        self.specs.iter().find(|s| s.tag == tag)
    }

    /// Fields in transmission order
    pub fn iter(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.specs.iter()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the catalog has no fields
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn validate_spec(spec: &FieldSpec) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidSpec { name: spec.name, reason };

    if spec.scale == 0 || 10u32.pow(spec.decimals()) != spec.scale {
        return Err(invalid(format!("scale {} is not a power of ten", spec.scale)));
    }
    if spec.kind.is_scaled() == (spec.scale == 1) {
        return Err(invalid(format!("scale {} does not match kind {:?}", spec.scale, spec.kind)));
    }

    let signed_kind = matches!(spec.kind, EncodingKind::SignedInt | EncodingKind::ScaledSignedInt);
    if spec.signed != signed_kind {
        return Err(invalid(format!("signedness does not match kind {:?}", spec.kind)));
    }

    if spec.kind.is_composite() {
        let composite = flags::composite_for(spec.tag)
            .ok_or_else(|| invalid("flag field has no bit table".to_string()))?;
        if composite.width_bytes() != usize::from(spec.size) || !composite.field.eq_ignore_ascii_case(spec.name) {
            return Err(invalid(format!("bit table {} does not fit the field", composite.field)));
        }
        return composite.validate();
    }

    let (lo, hi): (i64, i64) = match (spec.kind, spec.size, spec.signed) {
        (EncodingKind::Command, 0, _) => (0, 0),
        (_, 1, false) => (0, u8::MAX.into()),
        (_, 2, false) => (0, u16::MAX.into()),
        (_, 4, false) => (0, u32::MAX.into()),
        (_, 1, true) => (i8::MIN.into(), i8::MAX.into()),
        (_, 2, true) => (i16::MIN.into(), i16::MAX.into()),
        (_, 4, true) => (i32::MIN.into(), i32::MAX.into()),
        _ => return Err(invalid(format!("unsupported size {} for {:?}", spec.size, spec.kind))),
    };

    if spec.range.min > spec.range.upper() {
        return Err(invalid(format!("empty range {}", spec.range_text())));
    }
    if spec.range.min < lo || spec.range.upper() > hi {
        return Err(invalid(format!("range {} does not fit {} bytes", spec.range_text(), spec.size)));
    }
    if spec.kind != EncodingKind::Command && (spec.default < spec.range.min || spec.default > spec.range.upper()) {
        return Err(invalid(format!("default {} is outside {}", spec.format_value(spec.default), spec.range_text())));
    }

    Ok(())
}
