//! # Frame Checksum
//!
//! Additive mod-256 checksum for the BTH-series framing protocol.
//!
//! The trailing checksum byte is chosen so that the sum of every byte in the
//! frame, checksum included, equals 0xFF mod 256.

/// Sum of all bytes, mod 256
///
/// # Arguments
///
/// * `data` - Byte slice to sum (header + payload for an outbound frame)
///
/// # Returns
///
/// * `u8` - Wrapping byte sum
pub fn additive_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Checksum byte that makes the full frame sum to 0xFF
///
/// # Examples
///
/// ```
/// use btdaq::frame::checksum::{additive_checksum, complement};
///
/// let body = [0xDB, 0x00, 0x05, 0x00, 0x00];
/// let crc = complement(additive_checksum(&body));
/// assert_eq!(additive_checksum(&body).wrapping_add(crc), 0xFF);
/// ```
pub fn complement(sum: u8) -> u8 {
    0xFF - sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(additive_checksum(&[]), 0x00);
        assert_eq!(complement(0x00), 0xFF);
    }

    #[test]
    fn test_checksum_wraps() {
        let data = [0xFF, 0xFF, 0x02];
        assert_eq!(additive_checksum(&data), 0x00);
    }

    #[test]
    fn test_complement_relation_holds_for_all_sums() {
        for sum in 0..=255u8 {
            assert_eq!(sum.wrapping_add(complement(sum)), 0xFF);
        }
    }

    #[test]
    fn test_checksum_changes_with_data() {
        let data1 = [0xDB, 0x00, 0x05, 0x00, 0x00];
        let data2 = [0xDB, 0x00, 0x06, 0x00, 0x00];
        assert_ne!(
            complement(additive_checksum(&data1)),
            complement(additive_checksum(&data2))
        );
    }
}
