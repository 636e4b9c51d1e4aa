//! Resource Identifiers
//!
//! One anchor deployment is named across chains by a 32-byte handle:
//!
//! ```text
//! ResourceId        = [6 zero][20 anchor address][6 typed chain id]
//! Legacy ResourceId = [8 zero][20 anchor address][4 chain id]
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::chain::TypedChainId;
use crate::error::EncodingError;
use crate::fixed_hex::{decode_fixed, to_hex};

/// 20-byte contract address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Address left-padded to a 32-byte ABI word
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

impl FromStr for Address {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<20>(s).map(Self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 32-byte anchor handle
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ResourceId(pub [u8; 32]);

impl ResourceId {
    pub const LEN: usize = 32;

    /// Resource id of an anchor on a typed chain
    pub fn new(address: &Address, chain: &TypedChainId) -> Self {
        let mut out = [0u8; 32];
        out[6..26].copy_from_slice(&address.0);
        out[26..].copy_from_slice(&chain.to_bytes());
        Self(out)
    }

    /// Resource id of a fixed-denomination anchor keyed by a plain chain id
    pub fn legacy(address: &Address, chain_id: u32) -> Self {
        let mut out = [0u8; 32];
        out[8..28].copy_from_slice(&address.0);
        out[28..].copy_from_slice(&chain_id.to_be_bytes());
        Self(out)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| EncodingError::EncodingLengthMismatch {
                expected: Self::LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Anchor address of a typed resource id
    pub fn address(&self) -> Address {
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&self.0[6..26]);
        Address(addr)
    }

    /// Typed chain id of a typed resource id
    pub fn typed_chain_id(&self) -> Result<TypedChainId, EncodingError> {
        TypedChainId::from_bytes(&self.0[26..])
    }
}

impl FromStr for ResourceId {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<32>(s).map(Self)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.0))
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({self})")
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
