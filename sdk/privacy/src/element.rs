//! Field Elements
//!
//! Every commitment, nullifier, root, and key in the protocol is a BN254
//! scalar. On the wire they travel as 32-byte big-endian words, which is the
//! layout the ledger contracts expect.
//!
//! ```text
//! Element = [u8; 32]   // big-endian, always < field modulus when produced here
//! hex     = "0x" + 64 hex chars
//! ```

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PrivacyError;

/// Maximum number of random bytes that always stay below the field modulus.
pub const MAX_SAFE_RANDOM_BYTES: usize = 31;

/// A field element in big-endian byte form
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Element(pub [u8; 32]);

impl Element {
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create element from field element
    pub fn from_field(f: Fr) -> Self {
        let bytes = f.into_bigint().to_bytes_be();
        let mut arr = [0u8; 32];
        arr[32 - bytes.len()..].copy_from_slice(&bytes);
        Self(arr)
    }

    /// Convert to field element
    pub fn to_field(&self) -> Fr {
        Fr::from_be_bytes_mod_order(&self.0)
    }

    /// Reduce arbitrary big-endian bytes modulo the field order
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        Self::from_field(Fr::from_be_bytes_mod_order(bytes))
    }

    pub fn from_u64(value: u64) -> Self {
        let mut arr = [0u8; 32];
        arr[24..].copy_from_slice(&value.to_be_bytes());
        Self(arr)
    }

    pub fn from_u128(value: u128) -> Self {
        let mut arr = [0u8; 32];
        arr[16..].copy_from_slice(&value.to_be_bytes());
        Self(arr)
    }

    /// Signed value mapped into the field: negative values wrap to `p - |v|`
    pub fn from_i128(value: i128) -> Self {
        let magnitude = Fr::from(value.unsigned_abs());
        if value < 0 {
            Self::from_field(-magnitude)
        } else {
            Self::from_field(magnitude)
        }
    }

    /// Field subtraction `self - rhs`
    pub fn field_sub(&self, rhs: &Self) -> Self {
        Self::from_field(self.to_field() - rhs.to_field())
    }

    /// Sample `len` random bytes (at most 31) as a field element
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R, len: usize) -> Result<Self, PrivacyError> {
        if len == 0 || len > MAX_SAFE_RANDOM_BYTES {
            return Err(PrivacyError::InvalidRandomLength(len));
        }
        let mut arr = [0u8; 32];
        rng.fill_bytes(&mut arr[32 - len..]);
        Ok(Self(arr))
    }

    /// Parse a hex string (with or without `0x`), left-padding to 32 bytes
    pub fn from_hex(s: &str) -> Result<Self, PrivacyError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let bytes = hex::decode(&padded).map_err(|_| PrivacyError::InvalidHex(s.to_string()))?;
        if bytes.len() > 32 {
            return Err(PrivacyError::InvalidHex(s.to_string()));
        }
        let mut arr = [0u8; 32];
        arr[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Fixed-width `0x`-prefixed hex (64 digits)
    pub fn to_fixed_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl From<Fr> for Element {
    fn from(f: Fr) -> Self {
        Self::from_field(f)
    }
}

impl From<[u8; 32]> for Element {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Element {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Element {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fixed_hex())
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({})", self.to_fixed_hex())
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_fixed_hex())
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
