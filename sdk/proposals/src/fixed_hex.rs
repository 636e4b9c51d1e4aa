//! Fixed-width hex helpers
//!
//! Every multi-byte value on the wire is big-endian and rendered with a
//! `0x` marker.

use ethers_core::types::U256;

use crate::error::EncodingError;

/// `0x`-prefixed hex of raw bytes
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with or without the `0x` marker
pub fn decode_hex(s: &str) -> Result<Vec<u8>, EncodingError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|_| EncodingError::InvalidHex(s.to_string()))
}

/// Decode hex into exactly `N` bytes
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], EncodingError> {
    let bytes = decode_hex(s)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| EncodingError::EncodingLengthMismatch {
            expected: N,
            actual: bytes.len(),
        })
}

/// Read a big-endian u32 at `offset`
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_be_bytes(word)
}

/// Read a 32-byte word as u64, rejecting values wider than 8 bytes
pub(crate) fn read_u64_word(bytes: &[u8], offset: usize) -> Result<u64, EncodingError> {
    let word = U256::from_big_endian(&bytes[offset..offset + 32]);
    u64::try_from(word).map_err(|_| EncodingError::ValueOverflow(8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fixed_length() {
        assert_eq!(decode_fixed::<2>("0x0102").unwrap(), [1, 2]);
        assert!(matches!(
            decode_fixed::<4>("0x0102"),
            Err(EncodingError::EncodingLengthMismatch { expected: 4, actual: 2 })
        ));
        assert!(decode_hex("0xzz").is_err());
    }

    #[test]
    fn test_u64_word_overflow() {
        let mut word = [0u8; 32];
        word[31] = 7;
        assert_eq!(read_u64_word(&word, 0), Ok(7));
        word[23] = 1;
        assert_eq!(read_u64_word(&word, 0), Err(EncodingError::ValueOverflow(8)));
    }
}
