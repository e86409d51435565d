//! # Error Types
//!
//! Custom error types for Tracker Config using `thiserror`.
//!
//! [`EncodeError`] describes a problem with a single field. It is never
//! propagated out of an encode: the encoder records it as a diagnostic and
//! moves on to the next field. Everything else ends up in
//! [`TrackerConfigError`].

use thiserror::Error;

/// Problem encoding one field's raw value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Raw value is not a number (or flag list) of the expected shape
    #[error("{field}: cannot parse {value:?}: {reason}")]
    Parse {
        field: String,
        value: String,
        reason: String,
    },

    /// Parsed value lies outside the field's valid interval
    #[error("{field}: value {value} is out of range {allowed}")]
    Range {
        field: String,
        value: String,
        allowed: String,
    },

    /// Input names a field the catalog does not know
    #[error("{field}: unknown field")]
    UnknownField { field: String },

    /// Input names a field that another entry already supplied, differing only in case
    #[error("{field}: duplicate of {canonical}, ignored")]
    DuplicateField { field: String, canonical: String },
}

impl EncodeError {
    /// Name of the field the error refers to
    pub fn field(&self) -> &str {
        match self {
            EncodeError::Parse { field, .. }
            | EncodeError::Range { field, .. }
            | EncodeError::UnknownField { field }
            | EncodeError::DuplicateField { field, .. } => field,
        }
    }
}

/// Malformed field catalog, detected when the catalog is built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("duplicate tag 0x{tag:02x} ({first} and {second})")]
    DuplicateTag {
        tag: u8,
        first: &'static str,
        second: &'static str,
    },

    #[error("duplicate field name {0}")]
    DuplicateName(&'static str),

    #[error("tag 0x{tag:02x} ({name}) is not in ascending order")]
    OutOfOrder { tag: u8, name: &'static str },

    #[error("{name}: {reason}")]
    InvalidSpec {
        name: &'static str,
        reason: String,
    },

    #[error("{composite}: {reason}")]
    InvalidFlagTable {
        composite: &'static str,
        reason: String,
    },
}

/// Configuration message failed the frame check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("message too short: {0} bytes")]
    TooShort(usize),

    #[error("missing start marker (found 0x{0:02x})")]
    NoStx(u8),

    #[error("invalid field tag 0x{0:02x}")]
    InvalidField(u8),

    #[error("field 0x{0:02x} runs past the end of the message")]
    Truncated(u8),

    #[error("missing end marker")]
    NoEtx,

    #[error("checksum mismatch: expected {expected:02x?}, found {found:02x?}")]
    ChecksumMismatch { expected: [u8; 2], found: [u8; 2] },

    #[error("invalid hex: {0}")]
    Hex(String),
}

/// Main error type for Tracker Config
#[derive(Debug, Error)]
pub enum TrackerConfigError {
    /// Field catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Frame check errors
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Field-value input errors
    #[error("Input error: {0}")]
    Input(String),

    /// JSON input/output errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No serial device could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Transmission refused because the message is incomplete
    #[error("Transmission refused: {0}")]
    Refused(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Tracker Config
pub type Result<T> = std::result::Result<T, TrackerConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_error_names_field() {
        let err = EncodeError::Range {
            field: "HITEMP".to_string(),
            value: "85.01".to_string(),
            allowed: "[-40.00, 85.00]".to_string(),
        };
        assert_eq!(err.field(), "HITEMP");
        assert_eq!(
            err.to_string(),
            "HITEMP: value 85.01 is out of range [-40.00, 85.00]"
        );
    }

    #[test]
    fn test_duplicate_field_display() {
        let err = EncodeError::DuplicateField {
            field: "hipress".to_string(),
            canonical: "HIPRESS".to_string(),
        };
        assert_eq!(err.field(), "hipress");
        assert_eq!(err.to_string(), "hipress: duplicate of HIPRESS, ignored");
    }

    #[test]
    fn test_frame_error_display() {
        let err = FrameError::ChecksumMismatch {
            expected: [0x0a, 0xff],
            found: [0x00, 0x01],
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: expected [0a, ff], found [00, 01]"
        );
    }

    #[test]
    fn test_catalog_error_converts() {
        let err: TrackerConfigError = CatalogError::DuplicateName("DEST").into();
        assert!(matches!(err, TrackerConfigError::Catalog(_)));
        assert_eq!(err.to_string(), "Catalog error: duplicate field name DEST");
    }
}
