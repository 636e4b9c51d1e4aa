//! Proposal Payloads
//!
//! Instructions relayed to linked anchors. Every kind shares a header and
//! differs only in its payload:
//!
//! ```text
//! header          = resource_id (32) || selector (4) || nonce (4)
//! EdgeUpdate      = header(nonce = leaf index) || root (32) || src_resource_id (32)
//! HandlerUpdate   = header || handler address (20)
//! VerifierUpdate  = header || verifier address (20)
//! limit updates   = header || amount (32)
//! ```
//!
//! Selectors are the first 4 bytes of keccak256 of the target function
//! signature.

use ethers_core::types::U256;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::error::EncodingError;
use crate::fixed_hex::{read_u32, read_u64_word, to_hex};
use crate::resource::{Address, ResourceId};

pub const UPDATE_EDGE_SIGNATURE: &str = "updateEdge(bytes32,uint32,bytes32)";
pub const SET_HANDLER_SIGNATURE: &str = "setHandler(address,uint32)";
pub const SET_VERIFIER_SIGNATURE: &str = "setVerifier(address,uint32)";
pub const MIN_WITHDRAWAL_LIMIT_SIGNATURE: &str = "configureMinimalWithdrawalLimit(uint256,uint32)";
pub const MAX_DEPOSIT_LIMIT_SIGNATURE: &str = "configureMaximumDepositLimit(uint256,uint32)";

/// Length of the shared header
pub const HEADER_LEN: usize = 32 + 4 + 4;

/// First four bytes of `keccak256(signature)`
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}

/// Kind of proposal, one per target function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalKind {
    EdgeUpdate,
    HandlerUpdate,
    VerifierUpdate,
    MinWithdrawalLimit,
    MaxDepositLimit,
}

impl ProposalKind {
    pub const ALL: [ProposalKind; 5] = [
        ProposalKind::EdgeUpdate,
        ProposalKind::HandlerUpdate,
        ProposalKind::VerifierUpdate,
        ProposalKind::MinWithdrawalLimit,
        ProposalKind::MaxDepositLimit,
    ];

    pub fn signature(self) -> &'static str {
        match self {
            ProposalKind::EdgeUpdate => UPDATE_EDGE_SIGNATURE,
            ProposalKind::HandlerUpdate => SET_HANDLER_SIGNATURE,
            ProposalKind::VerifierUpdate => SET_VERIFIER_SIGNATURE,
            ProposalKind::MinWithdrawalLimit => MIN_WITHDRAWAL_LIMIT_SIGNATURE,
            ProposalKind::MaxDepositLimit => MAX_DEPOSIT_LIMIT_SIGNATURE,
        }
    }

    pub fn selector(self) -> [u8; 4] {
        function_selector(self.signature())
    }

    /// Total encoded length of this kind
    pub fn encoded_len(self) -> usize {
        HEADER_LEN
            + match self {
                ProposalKind::EdgeUpdate => 32 + 32,
                ProposalKind::HandlerUpdate | ProposalKind::VerifierUpdate => 20,
                ProposalKind::MinWithdrawalLimit | ProposalKind::MaxDepositLimit => 32,
            }
    }

    pub fn from_selector(selector: [u8; 4]) -> Result<Self, EncodingError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.selector() == selector)
            .ok_or(EncodingError::UnknownSelector(selector))
    }
}

/// A decoded proposal payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proposal {
    /// Propagate a new accumulator root to a linked anchor
    EdgeUpdate {
        resource_id: ResourceId,
        leaf_index: u32,
        root: [u8; 32],
        src_resource_id: ResourceId,
    },
    HandlerUpdate {
        resource_id: ResourceId,
        nonce: u32,
        handler: Address,
    },
    VerifierUpdate {
        resource_id: ResourceId,
        nonce: u32,
        verifier: Address,
    },
    MinWithdrawalLimit {
        resource_id: ResourceId,
        nonce: u32,
        amount: U256,
    },
    MaxDepositLimit {
        resource_id: ResourceId,
        nonce: u32,
        amount: U256,
    },
}

impl Proposal {
    pub fn kind(&self) -> ProposalKind {
        match self {
            Proposal::EdgeUpdate { .. } => ProposalKind::EdgeUpdate,
            Proposal::HandlerUpdate { .. } => ProposalKind::HandlerUpdate,
            Proposal::VerifierUpdate { .. } => ProposalKind::VerifierUpdate,
            Proposal::MinWithdrawalLimit { .. } => ProposalKind::MinWithdrawalLimit,
            Proposal::MaxDepositLimit { .. } => ProposalKind::MaxDepositLimit,
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Proposal::EdgeUpdate { resource_id, .. }
            | Proposal::HandlerUpdate { resource_id, .. }
            | Proposal::VerifierUpdate { resource_id, .. }
            | Proposal::MinWithdrawalLimit { resource_id, .. }
            | Proposal::MaxDepositLimit { resource_id, .. } => resource_id,
        }
    }

    /// Header nonce field (the leaf index for edge updates)
    pub fn nonce(&self) -> u32 {
        match self {
            Proposal::EdgeUpdate { leaf_index, .. } => *leaf_index,
            Proposal::HandlerUpdate { nonce, .. }
            | Proposal::VerifierUpdate { nonce, .. }
            | Proposal::MinWithdrawalLimit { nonce, .. }
            | Proposal::MaxDepositLimit { nonce, .. } => *nonce,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let kind = self.kind();
        let mut out = Vec::with_capacity(kind.encoded_len());
        out.extend_from_slice(self.resource_id().as_bytes());
        out.extend_from_slice(&kind.selector());
        out.extend_from_slice(&self.nonce().to_be_bytes());

        match self {
            Proposal::EdgeUpdate {
                root,
                src_resource_id,
                ..
            } => {
                out.extend_from_slice(root);
                out.extend_from_slice(src_resource_id.as_bytes());
            }
            Proposal::HandlerUpdate { handler: addr, .. }
            | Proposal::VerifierUpdate { verifier: addr, .. } => {
                out.extend_from_slice(addr.as_bytes());
            }
            Proposal::MinWithdrawalLimit { amount, .. }
            | Proposal::MaxDepositLimit { amount, .. } => {
                let mut word = [0u8; 32];
                amount.to_big_endian(&mut word);
                out.extend_from_slice(&word);
            }
        }

        out
    }

    /// `0x`-prefixed hex of [`Proposal::encode`]
    pub fn encode_hex(&self) -> String {
        to_hex(&self.encode())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() < HEADER_LEN {
            return Err(EncodingError::EncodingLengthMismatch {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let resource_id = ResourceId::from_slice(&bytes[..32])?;
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&bytes[32..36]);
        let kind = ProposalKind::from_selector(selector)?;

        if bytes.len() != kind.encoded_len() {
            return Err(EncodingError::EncodingLengthMismatch {
                expected: kind.encoded_len(),
                actual: bytes.len(),
            });
        }

        let nonce = read_u32(bytes, 36);
        let body = HEADER_LEN;

        Ok(match kind {
            ProposalKind::EdgeUpdate => {
                let mut root = [0u8; 32];
                root.copy_from_slice(&bytes[body..body + 32]);
                Proposal::EdgeUpdate {
                    resource_id,
                    leaf_index: nonce,
                    root,
                    src_resource_id: ResourceId::from_slice(&bytes[body + 32..])?,
                }
            }
            ProposalKind::HandlerUpdate | ProposalKind::VerifierUpdate => {
                let mut addr = [0u8; 20];
                addr.copy_from_slice(&bytes[body..]);
                if kind == ProposalKind::HandlerUpdate {
                    Proposal::HandlerUpdate {
                        resource_id,
                        nonce,
                        handler: Address(addr),
                    }
                } else {
                    Proposal::VerifierUpdate {
                        resource_id,
                        nonce,
                        verifier: Address(addr),
                    }
                }
            }
            ProposalKind::MinWithdrawalLimit => Proposal::MinWithdrawalLimit {
                resource_id,
                nonce,
                amount: U256::from_big_endian(&bytes[body..]),
            },
            ProposalKind::MaxDepositLimit => Proposal::MaxDepositLimit {
                resource_id,
                nonce,
                amount: U256::from_big_endian(&bytes[body..]),
            },
        })
    }
}

/// Root update of a fixed-denomination anchor
///
/// ```text
/// chain_id (32) || block_height (32) || root (32)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorUpdate {
    pub chain_id: u64,
    pub block_height: u64,
    pub root: [u8; 32],
}

impl AnchorUpdate {
    pub const LEN: usize = 96;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::LEN];
        out[24..32].copy_from_slice(&self.chain_id.to_be_bytes());
        out[56..64].copy_from_slice(&self.block_height.to_be_bytes());
        out[64..].copy_from_slice(&self.root);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        if bytes.len() != Self::LEN {
            return Err(EncodingError::EncodingLengthMismatch {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let chain_id = read_u64_word(bytes, 0)?;
        let block_height = read_u64_word(bytes, 32)?;
        let mut root = [0u8; 32];
        root.copy_from_slice(&bytes[64..]);

        Ok(Self {
            chain_id,
            block_height,
            root,
        })
    }
}
