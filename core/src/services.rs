//! External Services
//!
//! The ledger and the proof system are reached through these two traits.
//! Implementations own their transport; the anchor clients only see the
//! narrow contract below, which keeps every flow testable with in-memory
//! fakes.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vanchor_privacy::Element;
use vanchor_proposals::TypedChainId;

use crate::edges::Edge;
use crate::ext_data::ExtData;
use crate::inputs::Witness;
use crate::proof::Groth16Proof;

/// A state-changing call against the anchor contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// Insert one commitment (fixed-denomination anchor)
    Deposit { commitment: Element },
    /// `proof || roots || nullifierHash || recipient || relayer || fee || refund`
    Withdraw { calldata: Vec<u8> },
    /// `proof || public signals`, plus the external data the proof commits to
    Transact { calldata: Vec<u8>, ext_data: ExtData },
}

impl LedgerCall {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerCall::Deposit { .. } => "deposit",
            LedgerCall::Withdraw { .. } => "withdraw",
            LedgerCall::Transact { .. } => "transact",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(with = "hex")]
    pub tx_hash: [u8; 32],
    pub block_number: u64,
    pub gas_used: u64,
}

/// Read and write access to one anchor contract on one chain
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn chain_id(&self) -> Result<TypedChainId>;

    async fn block_number(&self) -> Result<u64>;

    /// Current accumulator root held by the contract
    async fn last_root(&self) -> Result<Element>;

    /// Neighbor roots in the contract's edge-list order
    async fn latest_neighbor_edges(&self) -> Result<Vec<Edge>>;

    /// Last governance nonce consumed by the contract
    async fn proposal_nonce(&self) -> Result<u32>;

    async fn submit(&self, call: LedgerCall) -> Result<Receipt>;
}

/// A proof together with the public signals it attests to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullProof {
    pub proof: Groth16Proof,
    pub public_signals: Vec<Element>,
}

/// Groth16 prover and verifier for the anchor circuits
#[async_trait]
pub trait ProofService: Send + Sync {
    async fn prove(&self, witness: &Witness) -> Result<FullProof>;

    async fn verify(&self, proof: &FullProof) -> Result<bool>;
}
