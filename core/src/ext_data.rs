//! External Data
//!
//! Public transaction metadata bound into the proof through its hash. The
//! hash is keccak256 over the ABI encoding of the tuple
//!
//! ```text
//! (address recipient, int256 extAmount, address relayer, uint256 fee,
//!  uint256 refund, address token, bytes encryptedOutput1, bytes encryptedOutput2)
//! ```
//!
//! reduced modulo the scalar field, so a proof cannot be replayed against
//! different recipients, fees, or ciphertexts.

use ethers_core::abi::{self, Token};
use ethers_core::types::{H160, I256, U256};
use ethers_core::utils::keccak256;
use serde::{Deserialize, Serialize};
use vanchor_privacy::Element;
use vanchor_proposals::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtData {
    pub recipient: Address,
    #[serde(with = "i256_dec")]
    pub ext_amount: I256,
    pub relayer: Address,
    pub fee: U256,
    pub refund: U256,
    pub token: Address,
    #[serde(with = "hex")]
    pub encrypted_output1: Vec<u8>,
    #[serde(with = "hex")]
    pub encrypted_output2: Vec<u8>,
}

impl ExtData {
    /// `abi.encode(extData)` for the tuple type above
    pub fn abi_encode(&self) -> Vec<u8> {
        abi::encode(&[Token::Tuple(vec![
            address_token(&self.recipient),
            Token::Int(self.ext_amount.into_raw()),
            address_token(&self.relayer),
            Token::Uint(self.fee),
            Token::Uint(self.refund),
            address_token(&self.token),
            Token::Bytes(self.encrypted_output1.clone()),
            Token::Bytes(self.encrypted_output2.clone()),
        ])])
    }

    /// Field-reduced keccak256 of the ABI encoding
    pub fn hash(&self) -> Element {
        Element::from_be_bytes_mod_order(&keccak256(self.abi_encode()))
    }
}

fn address_token(address: &Address) -> Token {
    Token::Address(H160::from(address.0))
}

/// Signed amounts travel as decimal strings
mod i256_dec {
    use ethers_core::types::I256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &I256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<I256, D::Error> {
        let s = String::deserialize(deserializer)?;
        I256::from_dec_str(&s).map_err(D::Error::custom)
    }
}
