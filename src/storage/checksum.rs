//! CRC32 checksums for journal records
//!
//! The checksum covers the record length, sequence number and payload.
//! Any mismatch on replay is corruption.

use crc32fast::Hasher;

/// Computes a CRC32 (IEEE) checksum over the provided byte slices in order.
pub fn compute_checksum(parts: &[&[u8]]) -> u32 {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(parts: &[&[u8]], expected: u32) -> bool {
    compute_checksum(parts) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data: &[u8] = b"journal record payload";
        assert_eq!(compute_checksum(&[data]), compute_checksum(&[data]));
    }

    #[test]
    fn test_split_input_matches_contiguous() {
        let whole: &[u8] = b"headerpayload";
        assert_eq!(
            compute_checksum(&[whole]),
            compute_checksum(&[b"header", b"payload"])
        );
    }

    #[test]
    fn test_checksum_detects_single_bit_flip() {
        let mut data = vec![0x00, 0x01, 0x02, 0x03, 0x04];
        let original = compute_checksum(&[&data]);
        data[2] ^= 0x01;
        assert_ne!(original, compute_checksum(&[&data]));
    }

    #[test]
    fn test_verify_checksum() {
        let data: &[u8] = b"payload";
        let checksum = compute_checksum(&[data]);
        assert!(verify_checksum(&[data], checksum));
        assert!(!verify_checksum(&[data], checksum ^ 1));
    }
}
