//! # Tracker Config Library
//!
//! Build configuration messages for an Iridium satellite tracker.
//!
//! A message is a framed run of tagged fields with a two-byte checksum,
//! sent to the tracker as a hex string over its serial console or queued
//! in a file for a satellite upload.
//!
//! ```
//! use tracker_config::codec::{encode_config, Catalog, FieldValue, FieldValues};
//!
//! let catalog = Catalog::standard().unwrap();
//! let mut values = FieldValues::new();
//! values.insert("HIPRESS".to_string(), FieldValue::included(1000i64));
//! values.insert("LOTEMP".to_string(), FieldValue::included(-10.5));
//!
//! let outcome = encode_config(&catalog, &values);
//! assert_eq!(outcome.hex(), "0234e80337e6fb033c82");
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod input;
pub mod serial;
pub mod transport;
