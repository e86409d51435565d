//! # Message Checksum
//!
//! Two-byte Fletcher-style running checksum (RFC 1145 8-bit variant) over
//! every byte of the message body, start and end markers included.
//!
//! **Sum A**: running sum of the bytes, mod 256
//! **Sum B**: running sum of the successive sum A values, mod 256

/// Calculate the message checksum
///
/// # Arguments
///
/// * `data` - Message body from the start marker through the end marker
///
/// # Returns
///
/// * `[u8; 2]` - `[sum A, sum B]`, in the order they are appended
///
/// # Examples
///
/// ```
/// use tracker_config::codec::checksum::checksum;
///
/// assert_eq!(checksum(&[0x02, 0x03]), [0x05, 0x07]);
/// ```
pub fn checksum(data: &[u8]) -> [u8; 2] {
    let mut sum_a: u8 = 0;
    let mut sum_b: u8 = 0;

    for &byte in data {
        sum_a = sum_a.wrapping_add(byte);
        sum_b = sum_b.wrapping_add(sum_a);
    }

    [sum_a, sum_b]
}

/// Check that the last two bytes of a message are the checksum of the rest
pub fn verify(message: &[u8]) -> bool {
    match message.len().checked_sub(2) {
        Some(split) => checksum(&message[..split]) == message[split..],
        None => false,
    }
}

/// Wide-accumulator form of the checksum, reduced only at the end
///
/// Used to check that the wrapping 8-bit sums agree with the definition.
#[cfg(test)]
fn checksum_wide(data: &[u8]) -> [u8; 2] {
    let mut sum_a: u64 = 0;
    let mut sum_b: u64 = 0;

    for &byte in data {
        sum_a += u64::from(byte);
        sum_b += sum_a;
    }

    [(sum_a % 256) as u8, (sum_b % 256) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), [0x00, 0x00]);
    }

    #[test]
    fn test_checksum_markers_only() {
        // A = 2, 5; B = 2, 7
        assert_eq!(checksum(&[0x02, 0x03]), [0x05, 0x07]);
    }

    #[test]
    fn test_checksum_matches_wide_sums() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0xff, 0xfe, 0xfd],
            vec![0x02, 0x34, 0xe8, 0x03, 0x37, 0xe6, 0xfb, 0x03],
            vec![0x00; 24],
            vec![0xff; 300],
        ];

        for data in test_data.iter() {
            assert_eq!(checksum(data), checksum_wide(data), "Checksum mismatch for data: {:?}", data);
        }
    }

    #[test]
    fn test_checksum_is_order_sensitive() {
        let data1 = [0x02, 0x34, 0x35, 0x03];
        let data2 = [0x02, 0x35, 0x34, 0x03];

        let sum1 = checksum(&data1);
        let sum2 = checksum(&data2);

        // Same bytes, so sum A agrees; sum B catches the swap
        assert_eq!(sum1[0], sum2[0]);
        assert_ne!(sum1[1], sum2[1]);
    }

    #[test]
    fn test_checksum_changes_with_data() {
        assert_ne!(checksum(&[0x02, 0x34, 0x00, 0x03]), checksum(&[0x02, 0x34, 0x01, 0x03]));
    }

    #[test]
    fn test_verify() {
        let mut message = vec![0x02, 0x34, 0xe8, 0x03, 0x03];
        let sum = checksum(&message);
        message.extend_from_slice(&sum);
        assert!(verify(&message));

        let last = message.len() - 1;
        message[last] ^= 0x01;
        assert!(!verify(&message));

        assert!(!verify(&[0x02]));
        assert!(verify(&[0x00, 0x00]));
    }
}
