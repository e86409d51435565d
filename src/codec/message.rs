//! # Configuration Message
//!
//! Frame assembly and the device-side frame check.
//!
//! ## Frame Structure
//!
//! ```text
//! [STX] [TAG] [PAYLOAD...] [TAG] [PAYLOAD...] ... [ETX] [SUM A] [SUM B]
//! ```
//!
//! - **STX**: always `0x02`
//! - **TAG / PAYLOAD**: one entry per included field, in catalog order;
//!   payload width is fixed by the tag
//! - **ETX**: always `0x03`
//! - **SUM A / SUM B**: Fletcher checksum over STX through ETX

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::catalog::Catalog;
use super::checksum::checksum;
use super::scalar::EncodedField;
use crate::error::FrameError;

/// Frame start marker
pub const START_MARKER: u8 = 0x02;

/// Frame end marker
pub const END_MARKER: u8 = 0x03;

/// Checksum length in bytes
pub const CHECKSUM_LEN: usize = 2;

/// Smallest possible message: markers plus checksum
pub const MIN_MESSAGE_LEN: usize = 2 + CHECKSUM_LEN;

/// Build the message body: start marker, every field's tag and payload, end marker
///
/// Fields are written in the order given; the encoder hands them over in
/// catalog order.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use tracker_config::codec::message::assemble;
/// use tracker_config::codec::scalar::EncodedField;
///
/// let fields = [EncodedField { tag: 0x34, payload: Bytes::from_static(&[0xe8, 0x03]) }];
/// assert_eq!(assemble(&fields), vec![0x02, 0x34, 0xe8, 0x03, 0x03]);
/// ```
pub fn assemble(fields: &[EncodedField]) -> Vec<u8> {
    let len = 2 + fields.iter().map(EncodedField::wire_len).sum::<usize>();
    let mut body = BytesMut::with_capacity(len);

    body.put_u8(START_MARKER);
    for field in fields {
        body.put_u8(field.tag);
        body.put_slice(&field.payload);
    }
    body.put_u8(END_MARKER);

    body.to_vec()
}

/// Complete configuration message, checksum included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMessage {
    bytes: Bytes,
}

impl ConfigMessage {
    /// Frame the given fields and append the checksum
    pub fn new(fields: &[EncodedField]) -> Self {
        let mut bytes = assemble(fields);
        let sum = checksum(&bytes);
        bytes.extend_from_slice(&sum);

        Self { bytes: Bytes::from(bytes) }
    }

    /// Parse the hex form of a message
    ///
    /// Surrounding whitespace is ignored. Only the hex itself is checked
    /// here; use [`check_message`] to validate the frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Hex`] for odd-length or non-hex input.
    pub fn from_hex(text: &str) -> Result<Self, FrameError> {
        let bytes = hex::decode(text.trim()).map_err(|e| FrameError::Hex(e.to_string()))?;
        Ok(Self { bytes: Bytes::from(bytes) })
    }

    /// Lower-case hex, two digits per byte, no separators
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// All message bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Start marker through end marker
    pub fn body(&self) -> &[u8] {
        &self.bytes[..self.bytes.len().saturating_sub(CHECKSUM_LEN)]
    }

    /// Trailing checksum bytes, if the message is long enough to have them
    pub fn checksum(&self) -> Option<[u8; 2]> {
        let split = self.bytes.len().checked_sub(CHECKSUM_LEN)?;
        Some([self.bytes[split], self.bytes[split + 1]])
    }

    /// Message length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the message has no bytes at all
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for ConfigMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Validate a message the way the tracker does before applying it
///
/// # Arguments
///
/// * `catalog` - Field catalog used to resolve tags and payload widths
/// * `message` - Complete message bytes, checksum included
///
/// # Returns
///
/// * `Result<Vec<EncodedField>, FrameError>` - Tagged fields in message order
///
/// # Errors
///
/// Returns error if:
/// - Message is shorter than markers plus checksum
/// - First byte is not the start marker
/// - A tag is not in the catalog
/// - A payload runs into the end marker position
/// - The end marker is missing
/// - The checksum does not match
pub fn check_message(catalog: &Catalog, message: &[u8]) -> Result<Vec<EncodedField>, FrameError> {
    if message.len() < MIN_MESSAGE_LEN {
        return Err(FrameError::TooShort(message.len()));
    }

    if message[0] != START_MARKER {
        return Err(FrameError::NoStx(message[0]));
    }

    let end = message.len() - CHECKSUM_LEN - 1;
    let mut fields = Vec::new();
    let mut pos = 1;

    while pos < end {
        let tag = message[pos];
        let spec = catalog.by_tag(tag).ok_or(FrameError::InvalidField(tag))?;

        let start = pos + 1;
        let stop = start + usize::from(spec.size);
        if stop > end {
            return Err(FrameError::Truncated(tag));
        }

        fields.push(EncodedField {
            tag,
            payload: Bytes::copy_from_slice(&message[start..stop]),
        });
        pos = stop;
    }

    if message[end] != END_MARKER {
        return Err(FrameError::NoEtx);
    }

    let expected = checksum(&message[..=end]);
    let found = [message[end + 1], message[end + 2]];
    if expected != found {
        return Err(FrameError::ChecksumMismatch { expected, found });
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::standard().unwrap()
    }

    fn field(tag: u8, payload: &'static [u8]) -> EncodedField {
        EncodedField { tag, payload: Bytes::from_static(payload) }
    }

    fn sample() -> ConfigMessage {
        ConfigMessage::new(&[field(0x34, &[0xe8, 0x03]), field(0x37, &[0xe6, 0xfb])])
    }

    #[test]
    fn test_assemble_empty() {
        assert_eq!(assemble(&[]), vec![START_MARKER, END_MARKER]);
    }

    #[test]
    fn test_empty_message() {
        let message = ConfigMessage::new(&[]);
        assert_eq!(message.as_bytes(), &[0x02, 0x03, 0x05, 0x07]);
        assert_eq!(message.to_hex(), "02030507");
        assert!(check_message(&catalog(), message.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_message_layout() {
        let message = sample();
        assert_eq!(message.body(), &[0x02, 0x34, 0xe8, 0x03, 0x37, 0xe6, 0xfb, 0x03]);
        assert_eq!(message.checksum(), Some(checksum(message.body())));
        assert_eq!(message.len(), 10);
    }

    #[test]
    fn test_hex_is_lower_case_without_separators() {
        let hex = sample().to_hex();
        assert_eq!(&hex[..16], "0234e80337e6fb03");
        assert_eq!(hex.len(), 20);
        assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_from_hex() {
        let message = sample();
        let parsed = ConfigMessage::from_hex(&format!("  {}\n", message.to_hex().to_uppercase())).unwrap();
        assert_eq!(parsed, message);

        assert!(matches!(ConfigMessage::from_hex("023"), Err(FrameError::Hex(_))));
        assert!(matches!(ConfigMessage::from_hex("zz"), Err(FrameError::Hex(_))));
    }

    #[test]
    fn test_check_message_returns_fields() {
        let message = sample();
        let fields = check_message(&catalog(), message.as_bytes()).unwrap();
        assert_eq!(fields, vec![field(0x34, &[0xe8, 0x03]), field(0x37, &[0xe6, 0xfb])]);
    }

    #[test]
    fn test_check_message_payload_may_contain_markers() {
        // HIPRESS 1000 ends in 0x03, DEST payload holds a 0x02
        let message = ConfigMessage::new(&[field(0x33, &[0x02, 0x00, 0x00, 0x00]), field(0x34, &[0xe8, 0x03])]);
        assert_eq!(check_message(&catalog(), message.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn test_check_message_too_short() {
        assert_eq!(check_message(&catalog(), &[0x02, 0x03, 0x05]), Err(FrameError::TooShort(3)));
    }

    #[test]
    fn test_check_message_no_stx() {
        assert_eq!(check_message(&catalog(), &[0x01, 0x03, 0x04, 0x07]), Err(FrameError::NoStx(0x01)));
    }

    #[test]
    fn test_check_message_invalid_field() {
        let message = ConfigMessage::new(&[field(0x99, &[])]);
        assert_eq!(check_message(&catalog(), message.as_bytes()), Err(FrameError::InvalidField(0x99)));
    }

    #[test]
    fn test_check_message_truncated() {
        // DEST needs four payload bytes, only two precede the end marker
        let message = ConfigMessage::new(&[field(0x33, &[0x01, 0x02])]);
        assert_eq!(check_message(&catalog(), message.as_bytes()), Err(FrameError::Truncated(0x33)));
    }

    #[test]
    fn test_check_message_no_etx() {
        let mut bytes = vec![0x02, 0x50, 0x04];
        let sum = checksum(&bytes);
        bytes.extend_from_slice(&sum);
        assert_eq!(check_message(&catalog(), &bytes), Err(FrameError::NoEtx));
    }

    #[test]
    fn test_check_message_checksum_mismatch() {
        let mut bytes = sample().as_bytes().to_vec();
        let last = bytes.len() - 1;
        let expected = [bytes[last - 1], bytes[last]];
        bytes[last] ^= 0xff;

        match check_message(&catalog(), &bytes) {
            Err(FrameError::ChecksumMismatch { expected: e, found }) => {
                assert_eq!(e, expected);
                assert_eq!(found, [expected[0], expected[1] ^ 0xff]);
            }
            other => panic!("Expected ChecksumMismatch, got: {:?}", other),
        }
    }
}
