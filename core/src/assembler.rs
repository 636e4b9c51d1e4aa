//! Transaction Assembler
//!
//! Shared by both anchor variants. Covers the steps of a shielded
//! transaction that do not depend on which anchor is being driven:
//!
//! ```text
//! pad -> external amount -> merkle proofs -> prove -> verify locally
//! ```
//!
//! Encoding and submission stay with the anchor, which owns the ledger.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};
use vanchor_config::CircuitConfig;
use vanchor_privacy::{CommitmentScheme, Element, MerklePath, MerkleTree, Utxo};

use crate::error::{AnchorError, AnchorResult};
use crate::inputs::Witness;
use crate::metrics::MetricsCollector;
use crate::services::{FullProof, ProofService};

/// Which side of a transaction a note set is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtxoSide {
    Inputs,
    Outputs,
}

pub struct TransactionAssembler {
    scheme: CommitmentScheme,
    circuit: CircuitConfig,
    prover: Arc<dyn ProofService>,
    prover_timeout: Option<Duration>,
    metrics: MetricsCollector,
}

impl TransactionAssembler {
    pub fn new(
        scheme: CommitmentScheme,
        circuit: CircuitConfig,
        prover: Arc<dyn ProofService>,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            scheme,
            circuit,
            prover,
            prover_timeout: None,
            metrics,
        }
    }

    pub fn with_prover_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.prover_timeout = timeout;
        self
    }

    pub fn scheme(&self) -> &CommitmentScheme {
        &self.scheme
    }

    pub fn circuit(&self) -> &CircuitConfig {
        &self.circuit
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Smallest circuit input arity that fits `given` real inputs
    pub fn input_arity(&self, given: usize) -> AnchorResult<usize> {
        if given <= self.circuit.n_ins_small {
            Ok(self.circuit.n_ins_small)
        } else if given <= self.circuit.n_ins_large {
            Ok(self.circuit.n_ins_large)
        } else {
            Err(AnchorError::TooManyInputs {
                given,
                arity: self.circuit.n_ins_large,
            })
        }
    }

    pub fn output_arity(&self) -> usize {
        self.circuit.n_outs
    }

    /// Append zero-amount notes on `chain_id` until `notes.len() == arity`
    pub fn pad_utxos<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        mut notes: Vec<Utxo>,
        arity: usize,
        side: UtxoSide,
        chain_id: u64,
    ) -> AnchorResult<Vec<Utxo>> {
        let given = notes.len();
        if given > arity {
            return Err(match side {
                UtxoSide::Inputs => AnchorError::TooManyInputs { given, arity },
                UtxoSide::Outputs => AnchorError::TooManyOutputs { given, arity },
            });
        }
        while notes.len() < arity {
            notes.push(Utxo::dummy(&self.scheme, rng, chain_id)?);
        }
        Ok(notes)
    }

    /// `sum(outputs) + fee - sum(inputs)`; positive deposits, negative withdraws
    pub fn external_amount(&self, inputs: &[Utxo], outputs: &[Utxo], fee: u128) -> AnchorResult<i128> {
        let total = |notes: &[Utxo]| {
            notes
                .iter()
                .try_fold(0i128, |acc, n| acc.checked_add(i128::try_from(n.amount()).ok()?))
                .ok_or(AnchorError::AmountOverflow)
        };
        let fee = i128::try_from(fee).map_err(|_| AnchorError::AmountOverflow)?;

        total(outputs)?
            .checked_add(fee)
            .and_then(|v| v.checked_sub(total(inputs).ok()?))
            .ok_or(AnchorError::AmountOverflow)
    }

    /// Circuit public amount: `extAmount - fee` in the field
    pub fn public_amount(&self, ext_amount: i128, fee: u128) -> Element {
        Element::from_i128(ext_amount).field_sub(&Element::from_u128(fee))
    }

    /// Membership path of an input note.
    ///
    /// Zero-amount notes get an all-zero path of tree depth without touching
    /// the tree.
    pub fn merkle_proof(&self, tree: &MerkleTree, note: &Utxo) -> AnchorResult<MerklePath> {
        if note.is_dummy() {
            return Ok(MerklePath::zeroed(tree.levels(), note.commitment(), tree.root()));
        }
        let index = u32::try_from(note.index())
            .map_err(|_| AnchorError::CommitmentNotFound(note.commitment().to_fixed_hex()))?;
        let path = tree.path(index)?;
        if path.element != note.commitment() {
            return Err(AnchorError::CommitmentNotFound(note.commitment().to_fixed_hex()));
        }
        Ok(path)
    }

    /// Generate a proof and re-verify it before anything is submitted
    pub async fn prove_and_verify(&self, witness: &Witness) -> AnchorResult<FullProof> {
        let circuit = witness.circuit_name();
        info!("Generating {} proof", circuit);

        let start = Instant::now();
        let proving = self.prover.prove(witness);
        let proof = match self.prover_timeout {
            Some(limit) => tokio::time::timeout(limit, proving)
                .await
                .map_err(|_| AnchorError::ProverTimeout(limit))?,
            None => proving.await,
        }
        .map_err(AnchorError::ProofService)?;
        let elapsed = start.elapsed();
        self.metrics.record_proof_time(elapsed);
        info!("{} proof generated in {:?}", circuit, elapsed);

        let valid = self
            .prover
            .verify(&proof)
            .await
            .map_err(AnchorError::ProofService)?;
        if !valid {
            warn!("{} proof failed local verification", circuit);
            return Err(AnchorError::ProofVerificationFailed);
        }
        debug!("{} proof verified locally", circuit);

        Ok(proof)
    }
}
