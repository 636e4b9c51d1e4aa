//! Anchor Clients
//!
//! Two variants drive the same capability set:
//!
//! - [`PlainAnchor`]: fixed-denomination deposit / withdraw
//! - [`IdentityAnchor`]: variable-amount transactions gated by identity-group
//!   membership
//!
//! Operations a variant does not support fail with
//! [`AnchorError::UnimplementedOperation`](crate::AnchorError::UnimplementedOperation).

mod identity;
mod plain;

pub use identity::IdentityAnchor;
pub use plain::{PlainAnchor, encode_withdraw_calldata};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vanchor_privacy::{DepositNote, Keypair, Utxo};
use vanchor_proposals::{Address, EncodingError, ResourceId, TypedChainId};

use crate::error::{AnchorError, AnchorResult};
use crate::ext_data::ExtData;
use crate::public_inputs::IdentityPublicInputs;
use crate::services::{LedgerClient, Receipt};

/// Capability set shared by every anchor variant
#[async_trait]
pub trait Anchor: Send {
    /// Resource id naming this deployment
    fn create_resource_id(&self) -> ResourceId;

    async fn deposit(&mut self, destination_chain_id: u64) -> AnchorResult<DepositOutcome>;

    async fn withdraw(&mut self, request: WithdrawRequest) -> AnchorResult<Receipt>;

    async fn transact(&mut self, request: TransactRequest) -> AnchorResult<TransactOutcome>;

    /// Bytes to relay so linked anchors learn this anchor's root
    async fn get_proposal_data(
        &mut self,
        resource_id: &ResourceId,
        leaf_index: Option<u32>,
    ) -> AnchorResult<Vec<u8>>;
}

// Requests and outcomes

#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub note: DepositNote,
    pub index: u32,
    pub receipt: Receipt,
}

/// Withdrawal of a fixed-denomination deposit
#[derive(Debug, Clone)]
pub struct WithdrawRequest {
    pub note: DepositNote,
    pub index: u32,
    pub recipient: Address,
    pub relayer: Address,
    pub fee: u128,
    pub refund: u128,
}

impl WithdrawRequest {
    /// Withdrawal without a relayer
    pub fn new(note: DepositNote, index: u32, recipient: Address) -> Self {
        Self {
            note,
            index,
            recipient,
            relayer: Address::ZERO,
            fee: 0,
            refund: 0,
        }
    }
}

/// A variable-amount transaction.
///
/// Real inputs must already be inserted; missing inputs and outputs are
/// padded with zero-amount notes.
#[derive(Debug, Clone)]
pub struct TransactRequest {
    /// Identity that proves group membership
    pub keypair: Keypair,
    pub inputs: Vec<Utxo>,
    pub outputs: Vec<Utxo>,
    pub fee: u128,
    pub refund: u128,
    pub recipient: Address,
    pub relayer: Address,
    /// Defaults to the configured token
    pub token: Option<Address>,
}

#[derive(Debug, Clone)]
pub struct TransactOutcome {
    pub receipt: Receipt,
    /// Padded outputs with their leaf indices set
    pub outputs: Vec<Utxo>,
    pub ext_data: ExtData,
    pub public_inputs: IdentityPublicInputs,
}

// Ledger binding

/// The ledger an anchor talks to, plus the nonce it last handed out
pub(crate) struct LedgerBinding {
    ledger: Arc<dyn LedgerClient>,
    chain: TypedChainId,
    address: Address,
    last_nonce: Option<u32>,
}

impl LedgerBinding {
    /// Bind to `ledger`, checking it serves `chain`
    pub(crate) async fn connect(
        ledger: Arc<dyn LedgerClient>,
        chain: TypedChainId,
        address: Address,
    ) -> AnchorResult<Self> {
        let actual = ledger.chain_id().await.map_err(AnchorError::Ledger)?;
        if actual != chain {
            return Err(AnchorError::ChainMismatch {
                expected: chain.as_u64(),
                actual: actual.as_u64(),
            });
        }
        Ok(Self {
            ledger,
            chain,
            address,
            last_nonce: None,
        })
    }

    pub(crate) fn ledger(&self) -> &dyn LedgerClient {
        self.ledger.as_ref()
    }

    pub(crate) fn chain(&self) -> TypedChainId {
        self.chain
    }

    pub(crate) fn address(&self) -> Address {
        self.address
    }

    /// Swap the ledger client; refused unless it serves the same chain
    pub(crate) async fn reconnect(&mut self, ledger: Arc<dyn LedgerClient>) -> AnchorResult<bool> {
        let chain = ledger.chain_id().await.map_err(AnchorError::Ledger)?;
        if chain != self.chain {
            info!("Keeping ledger client: new client serves {} not {}", chain, self.chain);
            return Ok(false);
        }
        self.ledger = ledger;
        Ok(true)
    }

    /// `max(ledger nonce, last issued) + 1`; fails once the u32 space is spent
    pub(crate) async fn next_nonce(&mut self) -> AnchorResult<u32> {
        let on_chain = self.ledger.proposal_nonce().await.map_err(AnchorError::Ledger)?;
        let base = self.last_nonce.map_or(on_chain, |last| last.max(on_chain));
        let nonce = base
            .checked_add(1)
            .ok_or(AnchorError::Encoding(EncodingError::ValueOverflow(4)))?;
        self.last_nonce = Some(nonce);
        Ok(nonce)
    }
}
