//! In-memory ledger and prover used by the flow tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Result, bail, ensure};
use async_trait::async_trait;
use rand::rngs::OsRng;
use vanchor_config::AnchorConfig;
use vanchor_privacy::{CommitmentScheme, Element, IdentityGroup, Keypair, MerkleTree};
use vanchor_proposals::{Address, TypedChainId};

use crate::edges::Edge;
use crate::inputs::Witness;
use crate::metrics::MetricsCollector;
use crate::proof::{Groth16Proof, split_words};
use crate::public_inputs::{CircuitArity, decode_transact_calldata};
use crate::services::{FullProof, LedgerCall, LedgerClient, ProofService, Receipt};
use crate::{IdentityAnchor, PlainAnchor};

pub const LEVELS: usize = 5;
pub const CHAIN_ID: u32 = 31337;
pub const LINKED_CHAIN_ID: u32 = 5001;

pub fn anchor_address() -> Address {
    Address([0xa1; 20])
}

pub fn test_config() -> AnchorConfig {
    let mut config = AnchorConfig::default();
    config.tree.levels = LEVELS;
    config.identity.levels = LEVELS;
    config.edges.linked_chains = vec![TypedChainId::evm(LINKED_CHAIN_ID)];
    config.chain.chain_id = CHAIN_ID;
    config.chain.anchor_address = anchor_address();
    config.chain.token = Address([0x70; 20]);
    config.prover.timeout_secs = Some(5);
    config
}

// Ledger

struct LedgerState {
    tree: MerkleTree,
    block: u64,
    nonce: u32,
    edges: Vec<Edge>,
    calls: Vec<LedgerCall>,
    spent: HashSet<Element>,
    fail_submit: bool,
}

/// Anchor contract double: keeps the authoritative tree and checks calldata
pub struct FakeLedger {
    chain: TypedChainId,
    config: AnchorConfig,
    inner: Mutex<LedgerState>,
}

impl FakeLedger {
    pub fn new(config: &AnchorConfig) -> Arc<Self> {
        Self::on_chain(config, config.chain.typed_chain_id())
    }

    pub fn on_chain(config: &AnchorConfig, chain: TypedChainId) -> Arc<Self> {
        let scheme = CommitmentScheme::poseidon();
        let tree = MerkleTree::with_history(config.tree.levels, config.tree.root_history_size, scheme.hasher().clone())
            .unwrap();
        Arc::new(Self {
            chain,
            config: config.clone(),
            inner: Mutex::new(LedgerState {
                tree,
                block: 100,
                nonce: 0,
                edges: Vec::new(),
                calls: Vec::new(),
                spent: HashSet::new(),
                fail_submit: false,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.inner.lock().unwrap()
    }

    /// Commitments inserted by other clients
    pub fn insert_leaves(&self, leaves: &[Element]) {
        let mut state = self.state();
        state.tree.extend(leaves).unwrap();
        state.block += 1;
    }

    pub fn leaves(&self) -> Vec<Element> {
        self.state().tree.leaves().to_vec()
    }

    pub fn root(&self) -> Element {
        self.state().tree.root()
    }

    pub fn block(&self) -> u64 {
        self.state().block
    }

    pub fn set_nonce(&self, nonce: u32) {
        self.state().nonce = nonce;
    }

    pub fn set_edges(&self, edges: Vec<Edge>) {
        self.state().edges = edges;
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.state().fail_submit = fail;
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state().calls.clone()
    }

    fn apply(&self, state: &mut LedgerState, call: &LedgerCall) -> Result<()> {
        match call {
            LedgerCall::Deposit { commitment } => {
                state.tree.insert(*commitment)?;
            }
            LedgerCall::Withdraw { calldata } => {
                let roots_len = self.config.circuit.vanchor_roots * 32;
                let words = split_words(&calldata[Groth16Proof::ENCODED_LEN..][..roots_len + 32])?;
                ensure!(state.tree.is_known_root(&words[0]), "cannot find your merkle root");
                let nullifier_hash = words[words.len() - 1];
                ensure!(state.spent.insert(nullifier_hash), "the note has been already spent");
            }
            LedgerCall::Transact { calldata, ext_data } => {
                let circuit = &self.config.circuit;
                let (_, inputs) = [circuit.n_ins_small, circuit.n_ins_large]
                    .into_iter()
                    .find_map(|n_ins| decode_transact_calldata(calldata, &CircuitArity::new(circuit, n_ins)).ok())
                    .ok_or_else(|| anyhow::anyhow!("malformed transact calldata"))?;

                ensure!(
                    state.tree.is_known_root(&inputs.vanchor_roots[0]),
                    "cannot find your merkle root"
                );
                ensure!(inputs.ext_data_hash == ext_data.hash(), "incorrect external data hash");
                for nullifier in &inputs.input_nullifiers {
                    ensure!(state.spent.insert(*nullifier), "input is already spent");
                }
                state.tree.extend(&inputs.output_commitments)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn chain_id(&self) -> Result<TypedChainId> {
        Ok(self.chain)
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.state().block)
    }

    async fn last_root(&self) -> Result<Element> {
        Ok(self.state().tree.root())
    }

    async fn latest_neighbor_edges(&self) -> Result<Vec<Edge>> {
        Ok(self.state().edges.clone())
    }

    async fn proposal_nonce(&self) -> Result<u32> {
        Ok(self.state().nonce)
    }

    async fn submit(&self, call: LedgerCall) -> Result<Receipt> {
        let mut state = self.state();
        if state.fail_submit {
            bail!("ledger rejected {}", call.name());
        }
        self.apply(&mut state, &call)?;

        let payload = match &call {
            LedgerCall::Deposit { commitment } => commitment.as_bytes().to_vec(),
            LedgerCall::Withdraw { calldata } | LedgerCall::Transact { calldata, .. } => calldata.clone(),
        };
        state.block += 1;
        state.calls.push(call);

        Ok(Receipt {
            tx_hash: *blake3::hash(&payload).as_bytes(),
            block_number: state.block,
            gas_used: 21_000 + 16 * payload.len() as u64,
        })
    }
}

// Prover

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProverMode {
    Honest,
    /// Proves fine, fails local verification
    Unsound,
    /// Returns publicAmount and extDataHash swapped
    Misordered,
}

/// Binds the public signals into the proof so verification is meaningful
pub struct FakeProver {
    mode: ProverMode,
    delay: Option<Duration>,
}

impl FakeProver {
    pub fn new(mode: ProverMode) -> Arc<Self> {
        Arc::new(Self { mode, delay: None })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            mode: ProverMode::Honest,
            delay: Some(delay),
        })
    }

    fn tag(signals: &[Element]) -> Element {
        let mut hasher = blake3::Hasher::new();
        for s in signals {
            hasher.update(s.as_bytes());
        }
        Element(*hasher.finalize().as_bytes())
    }
}

#[async_trait]
impl ProofService for FakeProver {
    async fn prove(&self, witness: &Witness) -> Result<FullProof> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut public_signals = witness.public_signals();
        if self.mode == ProverMode::Misordered {
            public_signals.swap(3, 4);
        }

        let tag = Self::tag(&public_signals);
        let proof = Groth16Proof {
            pi_a: [tag, Element::from_u64(1)],
            pi_b: [[Element::from_u64(2), Element::from_u64(3)], [Element::from_u64(4), Element::from_u64(5)]],
            pi_c: [Element::from_u64(6), Element::from_u64(7)],
        };
        Ok(FullProof { proof, public_signals })
    }

    async fn verify(&self, proof: &FullProof) -> Result<bool> {
        if self.mode == ProverMode::Unsound {
            return Ok(false);
        }
        Ok(proof.proof.pi_a[0] == Self::tag(&proof.public_signals))
    }
}

// Anchors

pub struct IdentityFixture {
    pub anchor: IdentityAnchor,
    pub ledger: Arc<FakeLedger>,
    pub sender: Keypair,
    pub metrics: MetricsCollector,
}

pub async fn identity_fixture(prover: Arc<FakeProver>) -> IdentityFixture {
    identity_fixture_with(&test_config(), prover).await
}

pub async fn identity_fixture_with(config: &AnchorConfig, prover: Arc<FakeProver>) -> IdentityFixture {
    let scheme = CommitmentScheme::poseidon();
    let ledger = FakeLedger::new(config);
    let metrics = MetricsCollector::new();

    let sender = Keypair::random(&mut OsRng, scheme.hasher().as_ref()).unwrap();
    let mut group = IdentityGroup::new(
        config.identity.levels,
        config.identity.root_history_size,
        config.edges.max_edges,
        scheme.hasher().clone(),
    )
    .unwrap();
    group.add_member(sender.public_key()).unwrap();

    let anchor = IdentityAnchor::connect(config, ledger.clone(), prover, group, scheme, metrics.clone())
        .await
        .unwrap();

    IdentityFixture {
        anchor,
        ledger,
        sender,
        metrics,
    }
}

pub async fn plain_fixture(prover: Arc<FakeProver>) -> (PlainAnchor, Arc<FakeLedger>) {
    let config = test_config();
    let ledger = FakeLedger::new(&config);
    let anchor = PlainAnchor::connect(
        &config,
        ledger.clone(),
        prover,
        CommitmentScheme::poseidon(),
        MetricsCollector::new(),
    )
    .await
    .unwrap();
    (anchor, ledger)
}
