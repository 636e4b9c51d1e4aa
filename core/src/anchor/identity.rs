//! Identity-linked variable anchor.
//!
//! Every transaction proves, besides note ownership, that the sender and
//! every output owner are members of the identity group. Roots from linked
//! chains enter the proof through the edge table, and local roots leave
//! through edge-update proposals.

use std::sync::Arc;

use async_trait::async_trait;
use ethers_core::types::{I256, U256};
use rand::rngs::OsRng;
use tracing::{debug, info};
use vanchor_config::AnchorConfig;
use vanchor_privacy::{
    CommitmentScheme, Element, IdentityGroup, Keypair, MerklePath, MerkleTree, PrivacyError, Utxo,
};
use vanchor_proposals::{Address, Proposal, ResourceId};

use super::{Anchor, DepositOutcome, LedgerBinding, TransactOutcome, TransactRequest, WithdrawRequest};
use crate::assembler::{TransactionAssembler, UtxoSide};
use crate::edges::EdgeTable;
use crate::error::{AnchorError, AnchorResult};
use crate::ext_data::ExtData;
use crate::inputs::{IdentityWitness, Witness};
use crate::metrics::MetricsCollector;
use crate::public_inputs::{CircuitArity, IdentityPublicInputs, encode_transact_calldata};
use crate::services::{LedgerCall, LedgerClient, ProofService, Receipt};
use crate::state::AnchorState;

pub struct IdentityAnchor {
    binding: LedgerBinding,
    state: AnchorState,
    group: IdentityGroup,
    edges: EdgeTable,
    assembler: TransactionAssembler,
    token: Address,
}

impl IdentityAnchor {
    pub async fn connect(
        config: &AnchorConfig,
        ledger: Arc<dyn LedgerClient>,
        prover: Arc<dyn ProofService>,
        group: IdentityGroup,
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
        let mut edges = EdgeTable::new(config.edges.max_edges);
        for chain in &config.edges.linked_chains {
            edges.link(chain.as_u64(), tree.zero_root())?;
        }
        let assembler = TransactionAssembler::new(scheme, config.circuit.clone(), prover, metrics)
            .with_prover_timeout(config.prover.timeout());

        info!(
            "Identity anchor {} connected on {} ({} linked chains)",
            config.chain.anchor_address,
            binding.chain(),
            edges.len()
        );

        Ok(Self {
            binding,
            state: AnchorState::new(tree),
            group,
            edges,
            assembler,
            token: config.chain.token,
        })
    }

    pub fn state(&self) -> &AnchorState {
        &self.state
    }

    pub fn group(&self) -> &IdentityGroup {
        &self.group
    }

    /// Membership changes and linked group roots
    pub fn group_mut(&mut self) -> &mut IdentityGroup {
        &mut self.group
    }

    pub fn edges(&self) -> &EdgeTable {
        &self.edges
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

    /// See [`AnchorState::resync`]
    pub async fn resync(&mut self, leaves: &[Element], synced_block: Option<u64>) -> AnchorResult<()> {
        self.state.resync(self.binding.ledger(), leaves, synced_block).await
    }

    // ===== Roots =====

    /// `[local root, edge roots...]` after pulling the ledger's neighbor view
    pub async fn populate_vanchor_roots_for_proof(&mut self) -> AnchorResult<Vec<Element>> {
        let neighbors = self
            .binding
            .ledger()
            .latest_neighbor_edges()
            .await
            .map_err(AnchorError::Ledger)?;
        let empty_root = self.state.tree().zero_root();
        self.edges.sync(&neighbors, empty_root)?;
        Ok(self.edges.roots_for_proof(self.state.root(), empty_root))
    }

    /// Current group root followed by the linked group roots
    pub fn populate_identity_roots_for_proof(&self) -> Vec<Element> {
        self.group.roots()
    }

    /// `[local root, ledger root]`
    pub async fn get_class_and_ledger_roots(&self) -> AnchorResult<[Element; 2]> {
        let ledger_root = self
            .binding
            .ledger()
            .last_root()
            .await
            .map_err(AnchorError::Ledger)?;
        Ok([self.state.root(), ledger_root])
    }

    // ===== Membership proofs =====

    pub fn get_merkle_proof(&self, note: &Utxo) -> AnchorResult<MerklePath> {
        self.assembler.merkle_proof(self.state.tree(), note)
    }

    pub fn identity_merkle_proof(&self, public_key: &Element) -> AnchorResult<MerklePath> {
        Ok(self.group.proof_for(public_key)?)
    }

    /// Group membership path of every output owner; zero paths for dummies
    pub fn generate_output_identity_proofs(&self, outputs: &[Utxo]) -> AnchorResult<Vec<MerklePath>> {
        outputs
            .iter()
            .map(|out| {
                if out.is_dummy() {
                    Ok(self.group.zero_proof())
                } else {
                    self.identity_merkle_proof(&out.public_key())
                }
            })
            .collect()
    }

    // ===== Proposals =====

    /// Edge update carrying `depositHistory[leaf_index]` (default: latest leaf)
    pub fn build_edge_update_proposal(
        &self,
        resource_id: &ResourceId,
        leaf_index: Option<u32>,
    ) -> AnchorResult<Proposal> {
        let leaf_index = leaf_index
            .or_else(|| self.state.latest_leaf_index())
            .ok_or(AnchorError::NoHistoryForIndex(0))?;
        let root = self
            .state
            .history_root(leaf_index)
            .ok_or(AnchorError::NoHistoryForIndex(leaf_index))?;

        debug!("Edge update for {} at leaf {} (root {})", resource_id, leaf_index, root);
        Ok(Proposal::EdgeUpdate {
            resource_id: *resource_id,
            leaf_index,
            root: root.to_bytes(),
            src_resource_id: self.create_resource_id(),
        })
    }

    pub async fn build_handler_update_proposal(&mut self, handler: Address) -> AnchorResult<Proposal> {
        let nonce = self.binding.next_nonce().await?;
        Ok(Proposal::HandlerUpdate {
            resource_id: self.create_resource_id(),
            nonce,
            handler,
        })
    }

    pub async fn build_verifier_update_proposal(&mut self, verifier: Address) -> AnchorResult<Proposal> {
        let nonce = self.binding.next_nonce().await?;
        Ok(Proposal::VerifierUpdate {
            resource_id: self.create_resource_id(),
            nonce,
            verifier,
        })
    }

    pub async fn build_withdraw_limit_proposal(&mut self, amount: U256) -> AnchorResult<Proposal> {
        let nonce = self.binding.next_nonce().await?;
        Ok(Proposal::MinWithdrawalLimit {
            resource_id: self.create_resource_id(),
            nonce,
            amount,
        })
    }

    pub async fn build_deposit_limit_proposal(&mut self, amount: U256) -> AnchorResult<Proposal> {
        let nonce = self.binding.next_nonce().await?;
        Ok(Proposal::MaxDepositLimit {
            resource_id: self.create_resource_id(),
            nonce,
            amount,
        })
    }

    // ===== Transaction =====

    async fn assemble_and_submit(&mut self, request: TransactRequest) -> AnchorResult<TransactOutcome> {
        let chain_id = self.binding.chain().as_u64();
        let asm = &self.assembler;

        // Pad
        let n_ins = asm.input_arity(request.inputs.len())?;
        let inputs = asm.pad_utxos(&mut OsRng, request.inputs, n_ins, UtxoSide::Inputs, chain_id)?;
        let outputs = asm.pad_utxos(
            &mut OsRng,
            request.outputs,
            asm.output_arity(),
            UtxoSide::Outputs,
            chain_id,
        )?;
        let arity = CircuitArity::new(asm.circuit(), n_ins);
        // Commitments are only inserted after the ledger accepts them
        self.state.ensure_room(outputs.len())?;

        // External data
        let ext_amount = asm.external_amount(&inputs, &outputs, request.fee)?;
        let public_amount = asm.public_amount(ext_amount, request.fee);
        let encrypted = outputs
            .iter()
            .map(|out| out.encrypt(&mut OsRng).map(|enc| enc.to_bytes()))
            .collect::<Result<Vec<_>, PrivacyError>>()?;
        let [encrypted_output1, encrypted_output2]: [Vec<u8>; 2] = encrypted
            .try_into()
            .map_err(|v: Vec<Vec<u8>>| AnchorError::TooManyOutputs { given: v.len(), arity: 2 })?;
        let ext_data = ExtData {
            recipient: request.recipient,
            ext_amount: I256::from(ext_amount),
            relayer: request.relayer,
            fee: U256::from(request.fee),
            refund: U256::from(request.refund),
            token: request.token.unwrap_or(self.token),
            encrypted_output1,
            encrypted_output2,
        };

        // Membership proofs
        let input_paths = inputs
            .iter()
            .map(|note| asm.merkle_proof(self.state.tree(), note))
            .collect::<AnchorResult<Vec<_>>>()?;
        let sender_path = self.identity_merkle_proof(&request.keypair.public_key())?;
        let output_paths = self.generate_output_identity_proofs(&outputs)?;
        let identity_roots = self.populate_identity_roots_for_proof();
        let vanchor_roots = self.populate_vanchor_roots_for_proof().await?;

        let witness = build_witness(
            &request.keypair,
            &inputs,
            &input_paths,
            &outputs,
            &output_paths,
            &sender_path,
            TransactSignals {
                chain_id: Element::from_u64(chain_id),
                public_amount,
                ext_data_hash: ext_data.hash(),
                identity_roots,
                vanchor_roots,
            },
        )?;
        let expected = witness.public_inputs();

        // Prove and verify
        let full_proof = self
            .assembler
            .prove_and_verify(&Witness::Identity(witness))
            .await?;
        let public_inputs = IdentityPublicInputs::from_signals(&full_proof.public_signals, &arity)?;
        check_public_inputs(&public_inputs, &expected)?;

        // Submit
        let calldata = encode_transact_calldata(&full_proof.proof, &public_inputs);
        let receipt = self
            .binding
            .ledger()
            .submit(LedgerCall::Transact {
                calldata,
                ext_data: ext_data.clone(),
            })
            .await
            .map_err(AnchorError::Ledger)?;
        self.assembler.metrics().record_gas(receipt.gas_used);

        // Commit
        let mut outputs = outputs;
        for out in &mut outputs {
            let index = self.state.insert_commitment(out.commitment())?;
            out.set_index(index);
        }
        info!(
            "Transaction confirmed in block {}: ext amount {}, {} inputs, root {}",
            receipt.block_number,
            ext_amount,
            n_ins,
            self.state.root()
        );

        Ok(TransactOutcome {
            receipt,
            outputs,
            ext_data,
            public_inputs,
        })
    }
}

#[async_trait]
impl Anchor for IdentityAnchor {
    fn create_resource_id(&self) -> ResourceId {
        ResourceId::new(&self.binding.address(), &self.binding.chain())
    }

    async fn deposit(&mut self, _destination_chain_id: u64) -> AnchorResult<DepositOutcome> {
        Err(AnchorError::UnimplementedOperation("deposit"))
    }

    async fn withdraw(&mut self, _request: WithdrawRequest) -> AnchorResult<Receipt> {
        Err(AnchorError::UnimplementedOperation("withdraw"))
    }

    async fn transact(&mut self, request: TransactRequest) -> AnchorResult<TransactOutcome> {
        self.assemble_and_submit(request).await
    }

    async fn get_proposal_data(
        &mut self,
        resource_id: &ResourceId,
        leaf_index: Option<u32>,
    ) -> AnchorResult<Vec<u8>> {
        Ok(self.build_edge_update_proposal(resource_id, leaf_index)?.encode())
    }
}

/// Public values of one transaction, fixed before the witness is built
struct TransactSignals {
    chain_id: Element,
    public_amount: Element,
    ext_data_hash: Element,
    identity_roots: Vec<Element>,
    vanchor_roots: Vec<Element>,
}

fn build_witness(
    sender: &Keypair,
    inputs: &[Utxo],
    input_paths: &[MerklePath],
    outputs: &[Utxo],
    output_paths: &[MerklePath],
    sender_path: &MerklePath,
    signals: TransactSignals,
) -> AnchorResult<IdentityWitness> {
    let private_key = |note: &Utxo| note.keypair().private_key().ok_or(PrivacyError::MissingPrivateKey);

    Ok(IdentityWitness {
        private_key: sender.private_key().ok_or(PrivacyError::MissingPrivateKey)?,
        identity_path_indices: sender_path.path_indices(),
        identity_path_elements: sender_path.siblings.clone(),
        identity_roots: signals.identity_roots,
        chain_id: signals.chain_id,
        public_amount: signals.public_amount,
        ext_data_hash: signals.ext_data_hash,

        input_nullifier: inputs.iter().map(Utxo::nullifier).collect::<Result<_, _>>()?,
        in_amount: inputs.iter().map(|n| Element::from_u128(n.amount())).collect(),
        in_private_key: inputs.iter().map(private_key).collect::<Result<_, _>>()?,
        in_blinding: inputs.iter().map(Utxo::blinding).collect(),
        in_path_indices: input_paths.iter().map(|p| Element::from_u64(u64::from(p.index))).collect(),
        in_path_elements: input_paths.iter().map(|p| p.siblings.clone()).collect(),

        output_commitment: outputs.iter().map(Utxo::commitment).collect(),
        out_chain_id: outputs.iter().map(|n| Element::from_u64(n.chain_id())).collect(),
        out_amount: outputs.iter().map(|n| Element::from_u128(n.amount())).collect(),
        out_pubkey: outputs.iter().map(Utxo::public_key).collect(),
        out_blinding: outputs.iter().map(Utxo::blinding).collect(),
        out_identity_path_indices: output_paths.iter().map(MerklePath::path_indices).collect(),
        out_identity_path_elements: output_paths.iter().map(|p| p.siblings.clone()).collect(),

        vanchor_roots: signals.vanchor_roots,
    })
}

/// The proof must attest to exactly what was assembled
fn check_public_inputs(actual: &IdentityPublicInputs, expected: &IdentityPublicInputs) -> AnchorResult<()> {
    let field = if actual.identity_roots != expected.identity_roots {
        "identityRoots"
    } else if actual.chain_id != expected.chain_id {
        "chainID"
    } else if actual.public_amount != expected.public_amount {
        "publicAmount"
    } else if actual.ext_data_hash != expected.ext_data_hash {
        "extDataHash"
    } else if actual.input_nullifiers != expected.input_nullifiers {
        "inputNullifier"
    } else if actual.output_commitments != expected.output_commitments {
        "outputCommitment"
    } else if actual.vanchor_roots != expected.vanchor_roots {
        "vanchorRoots"
    } else {
        return Ok(());
    };
    Err(AnchorError::PublicInputMismatch(field))
}
