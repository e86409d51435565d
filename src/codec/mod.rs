//! # Configuration Message Codec
//!
//! Builds the binary configuration message sent to the tracker.
//!
//! ## Pipeline
//!
//! ```text
//! FieldValues → encoder (per field: scalar / flags) → message → checksum → hex
//! ```
//!
//! The codec does no I/O. [`encoder::encode_config`] is a pure function of
//! the catalog and the field values and can be called from any thread.

pub mod catalog;
pub mod checksum;
pub mod diagnostics;
pub mod encoder;
pub mod flags;
pub mod message;
pub mod scalar;
pub mod value;

pub use catalog::{Catalog, EncodingKind, FieldSpec, ValueRange};
pub use diagnostics::{ConsistencyWarning, Diagnostic, Diagnostics};
pub use encoder::{encode_config, EncodeOutcome};
pub use message::{check_message, ConfigMessage};
pub use value::{FieldValue, FieldValues, RawValue};
