//! Fixed-denomination anchor.
//!
//! Deposits insert `hash(chainId, nullifier, secret)`; a withdrawal proves
//! knowledge of a leaf's secrets against one of the anchor's known roots and
//! reveals `hash(nullifier, nullifier)`.

use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::OsRng;
use tracing::info;
use vanchor_config::AnchorConfig;
use vanchor_privacy::{CommitmentScheme, Element, MerkleTree, NoteGenerator};
use vanchor_proposals::{AnchorUpdate, ResourceId};

use super::{Anchor, DepositOutcome, LedgerBinding, TransactOutcome, TransactRequest, WithdrawRequest};
use crate::assembler::TransactionAssembler;
use crate::error::{AnchorError, AnchorResult};
use crate::inputs::{WithdrawWitness, Witness};
use crate::metrics::MetricsCollector;
use crate::proof::{Groth16Proof, create_roots_bytes};
use crate::services::{LedgerCall, LedgerClient, ProofService, Receipt};
use crate::state::AnchorState;

pub struct PlainAnchor {
    binding: LedgerBinding,
    state: AnchorState,
    assembler: TransactionAssembler,
    notes: NoteGenerator,
    /// Root of the linked anchor, as last relayed to us
    linked_root: Element,
    root_count: usize,
}

impl PlainAnchor {
    pub async fn connect(
        config: &AnchorConfig,
        ledger: Arc<dyn LedgerClient>,
        prover: Arc<dyn ProofService>,
        scheme: CommitmentScheme,
        metrics: MetricsCollector,
    ) -> AnchorResult<Self> {
        let binding = LedgerBinding::connect(
            ledger,
            config.chain.typed_chain_id(),
            config.chain.anchor_address,
        )
        .await?;

        let tree = MerkleTree::with_history(
            config.tree.levels,
            config.tree.root_history_size,
            scheme.hasher().clone(),
        )?;
        let notes = NoteGenerator::new(scheme.clone())
            .with_lengths(config.notes.secret_len, config.notes.blinding_len)?;
        let assembler = TransactionAssembler::new(scheme, config.circuit.clone(), prover, metrics)
            .with_prover_timeout(config.prover.timeout());

        info!(
            "Plain anchor {} connected on {}",
            config.chain.anchor_address,
            binding.chain()
        );

        Ok(Self {
            binding,
            state: AnchorState::new(tree),
            assembler,
            notes,
            linked_root: Element::ZERO,
            root_count: config.circuit.vanchor_roots,
        })
    }

    pub fn state(&self) -> &AnchorState {
        &self.state
    }

    pub fn linked_root(&self) -> Element {
        self.linked_root
    }

    /// Record the linked anchor's latest root
    pub fn set_linked_root(&mut self, root: Element) {
        self.linked_root = root;
    }

    pub async fn reconnect(&mut self, ledger: Arc<dyn LedgerClient>) -> AnchorResult<bool> {
        self.binding.reconnect(ledger).await
    }

    /// See [`AnchorState::set_with_leaves`]
    pub async fn set_with_leaves(&mut self, leaves: &[Element], synced_block: Option<u64>) -> AnchorResult<bool> {
        self.state
            .set_with_leaves(self.binding.ledger(), leaves, synced_block)
            .await
    }

    /// `[local root, linked root]`, zero-padded to the circuit root count
    fn withdraw_roots(&self) -> Vec<Element> {
        let mut roots = vec![self.state.root(), self.linked_root];
        roots.resize(self.root_count.max(2), Element::ZERO);
        roots
    }
}

#[async_trait]
impl Anchor for PlainAnchor {
    fn create_resource_id(&self) -> ResourceId {
        ResourceId::legacy(&self.binding.address(), self.binding.chain().chain_id)
    }

    async fn deposit(&mut self, destination_chain_id: u64) -> AnchorResult<DepositOutcome> {
        self.state.ensure_room(1)?;
        let note = self.notes.generate_deposit(&mut OsRng, destination_chain_id)?;

        let receipt = self
            .binding
            .ledger()
            .submit(LedgerCall::Deposit {
                commitment: note.commitment,
            })
            .await
            .map_err(AnchorError::Ledger)?;
        self.assembler.metrics().record_gas(receipt.gas_used);

        let index = self.state.insert_commitment(note.commitment)?;
        info!(
            "Deposit {} inserted at leaf {} (block {})",
            note.commitment, index, receipt.block_number
        );

        Ok(DepositOutcome { note, index, receipt })
    }

    async fn withdraw(&mut self, request: WithdrawRequest) -> AnchorResult<Receipt> {
        let path = self.state.tree().path(request.index)?;
        if path.element != request.note.commitment {
            return Err(AnchorError::CommitmentNotFound(request.note.commitment.to_fixed_hex()));
        }

        let roots = self.withdraw_roots();
        let diffs = roots.iter().map(|r| r.field_sub(&path.root)).collect();
        let chain_id = Element::from_u64(self.binding.chain().as_u64());

        let witness = WithdrawWitness {
            nullifier_hash: request.note.nullifier_hash,
            recipient: Element(request.recipient.to_word()),
            relayer: Element(request.relayer.to_word()),
            fee: Element::from_u128(request.fee),
            refund: Element::from_u128(request.refund),
            chain_id,
            roots: roots.clone(),
            nullifier: request.note.nullifier,
            secret: request.note.secret,
            path_elements: path.siblings.clone(),
            path_indices: path.path_indices(),
            diffs,
        };
        let expected = witness.public_signals();

        let full_proof = self.assembler.prove_and_verify(&Witness::Withdraw(witness)).await?;
        if full_proof.public_signals != expected {
            return Err(AnchorError::PublicInputMismatch("withdraw signals"));
        }

        let calldata = encode_withdraw_calldata(&full_proof.proof, &roots, &request);
        let receipt = self
            .binding
            .ledger()
            .submit(LedgerCall::Withdraw { calldata })
            .await
            .map_err(AnchorError::Ledger)?;
        self.assembler.metrics().record_gas(receipt.gas_used);

        info!(
            "Withdrew leaf {} to {} (block {})",
            request.index, request.recipient, receipt.block_number
        );
        Ok(receipt)
    }

    async fn transact(&mut self, _request: TransactRequest) -> AnchorResult<TransactOutcome> {
        Err(AnchorError::UnimplementedOperation("transact"))
    }

    /// `chainId(32) || blockHeight(32) || root(32)`; arguments are ignored
    async fn get_proposal_data(
        &mut self,
        _resource_id: &ResourceId,
        _leaf_index: Option<u32>,
    ) -> AnchorResult<Vec<u8>> {
        let block_height = self
            .binding
            .ledger()
            .block_number()
            .await
            .map_err(AnchorError::Ledger)?;
        let update = AnchorUpdate {
            chain_id: u64::from(self.binding.chain().chain_id),
            block_height,
            root: self.state.root().to_bytes(),
        };
        Ok(update.encode())
    }
}

/// `proof || roots || nullifierHash || recipient(20) || relayer(20) || fee || refund`
pub fn encode_withdraw_calldata(proof: &Groth16Proof, roots: &[Element], request: &WithdrawRequest) -> Vec<u8> {
    let mut out = proof.encode();
    out.extend_from_slice(&create_roots_bytes(roots));
    out.extend_from_slice(request.note.nullifier_hash.as_bytes());
    out.extend_from_slice(request.recipient.as_bytes());
    out.extend_from_slice(request.relayer.as_bytes());
    out.extend_from_slice(Element::from_u128(request.fee).as_bytes());
    out.extend_from_slice(Element::from_u128(request.refund).as_bytes());
    out
}
