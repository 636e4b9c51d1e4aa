//! Typed Chain Identifiers
//!
//! A chain is named by its ecosystem tag plus the chain's own id:
//!
//! ```text
//! TypedChainId = chain_type (2 bytes) || chain_id (4 bytes)   // 6 bytes, big-endian
//! as integer   = chain_type << 32 | chain_id
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EncodingError;

/// Ecosystem tag of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    Evm,
    Substrate,
    Polkadot,
    Kusama,
    Rococo,
    Cosmos,
    Solana,
}

impl ChainType {
    pub fn tag(self) -> u16 {
        match self {
            ChainType::Evm => 0x0100,
            ChainType::Substrate => 0x0200,
            ChainType::Polkadot => 0x0301,
            ChainType::Kusama => 0x0302,
            ChainType::Rococo => 0x0303,
            ChainType::Cosmos => 0x0400,
            ChainType::Solana => 0x0500,
        }
    }

    pub fn from_tag(tag: u16) -> Result<Self, EncodingError> {
        Ok(match tag {
            0x0100 => ChainType::Evm,
            0x0200 => ChainType::Substrate,
            0x0301 => ChainType::Polkadot,
            0x0302 => ChainType::Kusama,
            0x0303 => ChainType::Rococo,
            0x0400 => ChainType::Cosmos,
            0x0500 => ChainType::Solana,
            other => return Err(EncodingError::UnknownChainType(other)),
        })
    }
}

/// Chain id qualified by its ecosystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypedChainId {
    pub chain_type: ChainType,
    pub chain_id: u32,
}

impl TypedChainId {
    pub const LEN: usize = 6;

    pub fn new(chain_type: ChainType, chain_id: u32) -> Self {
        Self {
            chain_type,
            chain_id,
        }
    }

    pub fn evm(chain_id: u32) -> Self {
        Self::new(ChainType::Evm, chain_id)
    }

    /// Integer form used as the note's destination chain and circuit input
    pub fn as_u64(&self) -> u64 {
        (u64::from(self.chain_type.tag()) << 32) | u64::from(self.chain_id)
    }

    pub fn from_u64(value: u64) -> Result<Self, EncodingError> {
        if value >> 48 != 0 {
            return Err(EncodingError::ValueOverflow(Self::LEN));
        }
        let tag = u16::try_from(value >> 32).map_err(|_| EncodingError::ValueOverflow(Self::LEN))?;
        let chain_id = u32::try_from(value & 0xffff_ffff).map_err(|_| EncodingError::ValueOverflow(Self::LEN))?;
        Ok(Self::new(ChainType::from_tag(tag)?, chain_id))
    }

    pub fn to_bytes(&self) -> [u8; 6] {
        let mut out = [0u8; 6];
        out[..2].copy_from_slice(&self.chain_type.tag().to_be_bytes());
        out[2..].copy_from_slice(&self.chain_id.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() != Self::LEN {
            return Err(EncodingError::EncodingLengthMismatch {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let tag = u16::from_be_bytes([bytes[0], bytes[1]]);
        let chain_id = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        Ok(Self::new(ChainType::from_tag(tag)?, chain_id))
    }
}

impl fmt::Display for TypedChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.chain_type, self.chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evm_chain_layout() {
        let chain = TypedChainId::evm(31337);
        assert_eq!(chain.to_bytes(), [0x01, 0x00, 0x00, 0x00, 0x7a, 0x69]);
        assert_eq!(chain.as_u64(), 0x0100_0000_7a69);
        assert_eq!(TypedChainId::from_u64(chain.as_u64()).unwrap(), chain);
        assert_eq!(TypedChainId::from_bytes(&chain.to_bytes()).unwrap(), chain);
    }

    #[test]
    fn test_unknown_chain_type() {
        assert_eq!(
            TypedChainId::from_bytes(&[0x09, 0x09, 0, 0, 0, 1]),
            Err(EncodingError::UnknownChainType(0x0909))
        );
        assert!(TypedChainId::from_u64(1 << 50).is_err());
    }
}
