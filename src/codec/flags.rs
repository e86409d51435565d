//! # Bitmask Composer
//!
//! Builds the composite flag fields from sets of named boolean sub-flags.
//!
//! Three composites exist:
//! - `FLAGS1`: 8 message options, one bit each
//! - `FLAGS2`: 4 alarm options packed into the high nibble
//! - `MOFIELDS`: the 88-bit presence mask selecting which items the tracker
//!   reports; each item's bit index is its message-field ID
//!
//! Bit index 0 is the most significant bit of the first byte, so a composite
//! serialises most-significant byte first.

use crate::error::{CatalogError, EncodeError};

/// Named bit inside a composite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagBit {
    /// Flag name as it appears in field-value input
    pub name: &'static str,

    /// Bit index, 0 = MSB of the first byte
    pub bit: u8,
}

const fn flag(name: &'static str, bit: u8) -> FlagBit {
    FlagBit { name, bit }
}

/// A composite bitfield and its fixed bit assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Composite {
    /// Catalog field carrying the composite
    pub field: &'static str,

    /// Tag byte of that field
    pub tag: u8,

    /// Width in bits (a whole number of bytes)
    pub width_bits: u8,

    /// Bit assignments
    pub bits: &'static [FlagBit],

    /// Flags set in the tracker's factory configuration
    pub defaults: &'static [&'static str],
}

/// Message option flags
pub const FLAGS1: Composite = Composite {
    field: "FLAGS1",
    tag: 0x31,
    width_bits: 8,
    bits: &[
        flag("BINARY", 0),
        flag("DEST", 1),
        flag("HIPRESS", 2),
        flag("LOPRESS", 3),
        flag("HITEMP", 4),
        flag("LOTEMP", 5),
        flag("HIHUMID", 6),
        flag("LOHUMID", 7),
    ],
    defaults: &[],
};

/// Alarm option flags (low nibble reserved)
pub const FLAGS2: Composite = Composite {
    field: "FLAGS2",
    tag: 0x32,
    width_bits: 8,
    bits: &[
        flag("GEOFENCE", 0),
        flag("INSIDE", 1),
        flag("LOWBATT", 2),
        flag("RING", 3),
    ],
    defaults: &[],
};

/// Presence mask of reportable telemetry items
pub const MOFIELDS: Composite = Composite {
    field: "MOFIELDS",
    tag: 0x30,
    width_bits: 88,
    bits: &[
        flag("SWVER", 0x04),
        flag("SOURCE", 0x08),
        flag("BATTV", 0x09),
        flag("PRESS", 0x0a),
        flag("TEMP", 0x0b),
        flag("HUMID", 0x0c),
        flag("YEAR", 0x0d),
        flag("MONTH", 0x0e),
        flag("DAY", 0x0f),
        flag("HOUR", 0x10),
        flag("MIN", 0x11),
        flag("SEC", 0x12),
        flag("MILLIS", 0x13),
        flag("DATETIME", 0x14),
        flag("LAT", 0x15),
        flag("LON", 0x16),
        flag("ALT", 0x17),
        flag("SPEED", 0x18),
        flag("HEAD", 0x19),
        flag("SATS", 0x1a),
        flag("HDOP", 0x1b),
        flag("PDOP", 0x1c),
        flag("FIX", 0x1d),
        flag("USERVAL1", 0x20),
        flag("USERVAL2", 0x21),
        flag("USERVAL3", 0x22),
        flag("USERVAL4", 0x23),
        flag("USERVAL5", 0x24),
        flag("USERVAL6", 0x25),
        flag("USERVAL7", 0x26),
        flag("USERVAL8", 0x27),
        flag("FLAGS1", 0x31),
        flag("FLAGS2", 0x32),
        flag("DEST", 0x33),
        flag("HIPRESS", 0x34),
        flag("LOPRESS", 0x35),
        flag("HITEMP", 0x36),
        flag("LOTEMP", 0x37),
        flag("HIHUMID", 0x38),
        flag("LOHUMID", 0x39),
        flag("GEOFNUM", 0x3a),
        flag("WAKEINT", 0x47),
        flag("ALARMINT", 0x48),
        flag("TXINT", 0x49),
    ],
    defaults: &["DATETIME", "LAT", "LON", "ALT"],
};

/// All composites, in tag order
pub const COMPOSITES: &[Composite] = &[MOFIELDS, FLAGS1, FLAGS2];

/// Find the composite carried by a tag
pub fn composite_for(tag: u8) -> Option<&'static Composite> {
    COMPOSITES.iter().find(|c| c.tag == tag)
}

/// Pack an ordered sequence of booleans into an integer, first flag in the
/// most significant position
///
/// # Examples
///
/// ```
/// use tracker_config::codec::flags::compose;
///
/// assert_eq!(compose(&[true, false, true, true]), 0b1011);
/// assert_eq!(compose(&[]), 0);
/// ```
pub fn compose(flags: &[bool]) -> u128 {
    flags
        .iter()
        .fold(0u128, |acc, &set| (acc << 1) | u128::from(set))
}

impl Composite {
    /// Width in bytes
    pub fn width_bytes(&self) -> usize {
        usize::from(self.width_bits) / 8
    }

    /// Look up a flag by name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<&FlagBit> {
        self.bits.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Integer value with only the given bit set
    fn bit_value(&self, bit: u8) -> u128 {
        1u128 << (u32::from(self.width_bits) - 1 - u32::from(bit))
    }

    /// Value with every assigned bit set
    pub fn valid_mask(&self) -> u128 {
        self.bits
            .iter()
            .fold(0, |acc, f| acc | self.bit_value(f.bit))
    }

    /// Compose a value from a set of flag names
    ///
    /// Names are matched case-insensitively; repeating a name is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Parse`] naming the first unknown flag.
    pub fn compose_names<S: AsRef<str>>(&self, names: &[S]) -> Result<u128, EncodeError> {
        let mut flags = vec![false; usize::from(self.width_bits)];

        for name in names {
            let name = name.as_ref();
            let bit = self.find(name).ok_or_else(|| EncodeError::Parse {
                field: self.field.to_string(),
                value: name.to_string(),
                reason: "unknown flag".to_string(),
            })?;
            flags[usize::from(bit.bit)] = true;
        }

        Ok(compose(&flags))
    }

    /// Compose only the names this composite knows, skipping the rest
    pub fn compose_known_names<S: AsRef<str>>(&self, names: &[S]) -> u128 {
        names
            .iter()
            .filter_map(|name| self.find(name.as_ref()))
            .fold(0, |acc, f| acc | self.bit_value(f.bit))
    }

    /// Names of the flags set in a composed value, in bit order
    pub fn flag_names(&self, value: u128) -> Vec<&'static str> {
        let mut set: Vec<&FlagBit> = self
            .bits
            .iter()
            .filter(|f| value & self.bit_value(f.bit) != 0)
            .collect();
        set.sort_by_key(|f| f.bit);
        set.into_iter().map(|f| f.name).collect()
    }

    /// Serialise a composed value, most significant byte first
    pub fn to_bytes(&self, value: u128) -> Vec<u8> {
        let bytes = value.to_be_bytes();
        bytes[bytes.len() - self.width_bytes()..].to_vec()
    }

    /// Read a composed value back from its serialised bytes
    pub fn from_bytes(&self, bytes: &[u8]) -> Option<u128> {
        if bytes.len() != self.width_bytes() {
            return None;
        }
        Some(bytes.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b)))
    }

    /// Check the bit table: whole bytes, positions in range, no reuse
    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidFlagTable {
            composite: self.field,
            reason,
        };

        if self.width_bits == 0 || self.width_bits % 8 != 0 || self.width_bits > 128 {
            return Err(invalid(format!("width {} is not a whole number of bytes", self.width_bits)));
        }

        for (i, flag) in self.bits.iter().enumerate() {
            if flag.bit >= self.width_bits {
                return Err(invalid(format!("{} uses bit {} outside the field", flag.name, flag.bit)));
            }
            for other in &self.bits[..i] {
                if other.bit == flag.bit {
                    return Err(invalid(format!("{} and {} share bit {}", other.name, flag.name, flag.bit)));
                }
                if other.name.eq_ignore_ascii_case(flag.name) {
                    return Err(invalid(format!("duplicate flag {}", flag.name)));
                }
            }
        }

        for name in self.defaults {
            if self.find(name).is_none() {
                return Err(invalid(format!("default flag {} is not assigned", name)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_msb_first() {
        assert_eq!(compose(&[true]), 1);
        assert_eq!(compose(&[true, false]), 2);
        assert_eq!(compose(&[false, false, false, false, false, false, false, true]), 1);
        assert_eq!(compose(&[true, false, false, false, false, false, false, false]), 0x80);
        assert_eq!(compose(&[true; 8]), 0xff);
    }

    #[test]
    fn test_flags1_bits() {
        assert_eq!(FLAGS1.compose_names(&["BINARY"]).unwrap(), 0x80);
        assert_eq!(FLAGS1.compose_names(&["LOHUMID"]).unwrap(), 0x01);
        assert_eq!(FLAGS1.compose_names(&["dest", "HITEMP"]).unwrap(), 0x48);
        assert_eq!(FLAGS1.valid_mask(), 0xff);
    }

    #[test]
    fn test_flags2_uses_high_nibble() {
        let all = FLAGS2.compose_names(&["GEOFENCE", "INSIDE", "LOWBATT", "RING"]).unwrap();
        assert_eq!(all, 0xf0);
        assert_eq!(FLAGS2.compose_names(&["RING"]).unwrap(), 0x10);
        assert_eq!(FLAGS2.valid_mask(), 0xf0);
    }

    #[test]
    fn test_presence_mask_defaults() {
        // DATETIME, LAT, LON, ALT are IDs 0x14..=0x17: byte 2, low nibble
        let value = MOFIELDS.compose_names(MOFIELDS.defaults).unwrap();
        let bytes = MOFIELDS.to_bytes(value);
        assert_eq!(bytes.len(), 11);
        assert_eq!(bytes, vec![0, 0, 0x0f, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_presence_mask_bit_position_is_field_id() {
        let value = MOFIELDS.compose_names(&["SWVER"]).unwrap();
        assert_eq!(MOFIELDS.to_bytes(value)[0], 0x08);

        let value = MOFIELDS.compose_names(&["TXINT"]).unwrap();
        // 0x49 = 73: byte 9, bit 1 from the MSB
        assert_eq!(MOFIELDS.to_bytes(value)[9], 0x40);
    }

    #[test]
    fn test_presence_mask_has_44_items() {
        assert_eq!(MOFIELDS.bits.len(), 44);
        assert_eq!(MOFIELDS.valid_mask().count_ones(), 44);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = FLAGS1.compose_names(&["BINARY", "WARP"]).unwrap_err();
        match err {
            EncodeError::Parse { field, value, .. } => {
                assert_eq!(field, "FLAGS1");
                assert_eq!(value, "WARP");
            }
            other => panic!("Expected Parse error, got: {:?}", other),
        }
    }

    #[test]
    fn test_compose_known_names_skips_unknown() {
        let value = MOFIELDS.compose_known_names(&["LAT", "WARP"]);
        assert_eq!(value, MOFIELDS.compose_names(&["LAT"]).unwrap());
        assert_eq!(FLAGS1.compose_known_names(&["WARP"]), 0);
    }

    #[test]
    fn test_flag_names_round_trip() {
        let value = FLAGS1.compose_names(&["LOTEMP", "BINARY"]).unwrap();
        assert_eq!(FLAGS1.flag_names(value), vec!["BINARY", "LOTEMP"]);

        let bytes = MOFIELDS.to_bytes(MOFIELDS.compose_names(&["FIX", "SOURCE"]).unwrap());
        let value = MOFIELDS.from_bytes(&bytes).unwrap();
        assert_eq!(MOFIELDS.flag_names(value), vec!["SOURCE", "FIX"]);
        assert_eq!(MOFIELDS.from_bytes(&bytes[1..]), None);
    }

    #[test]
    fn test_builtin_composites_validate() {
        for composite in COMPOSITES {
            assert!(composite.validate().is_ok(), "{} should validate", composite.field);
        }
    }

    #[test]
    fn test_validate_rejects_shared_bit() {
        static BITS: [FlagBit; 2] = [flag("A", 3), flag("B", 3)];
        let bad = Composite {
            field: "BAD",
            tag: 0x31,
            width_bits: 8,
            bits: &BITS,
            defaults: &[],
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bit_outside_width() {
        static BITS: [FlagBit; 1] = [flag("A", 8)];
        let bad = Composite {
            field: "BAD",
            tag: 0x31,
            width_bits: 8,
            bits: &BITS,
            defaults: &[],
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_composite_lookup() {
        assert_eq!(composite_for(0x30).map(|c| c.field), Some("MOFIELDS"));
        assert_eq!(composite_for(0x32).map(|c| c.field), Some("FLAGS2"));
        assert!(composite_for(0x33).is_none());
    }
}
