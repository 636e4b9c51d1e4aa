//! VAnchor client core.
//!
//! Builds shielded transactions for anchor contracts, keeps a local copy of
//! the commitment accumulator in step with the ledger, and encodes the
//! proposals that carry roots between linked anchors.
//!
//! The ledger and the proof system are injected through
//! [`LedgerClient`] and [`ProofService`].

pub mod anchor;
pub mod assembler;
pub mod edges;
pub mod error;
pub mod ext_data;
pub mod inputs;
pub mod metrics;
pub mod proof;
pub mod public_inputs;
pub mod services;
pub mod state;

#[cfg(test)]
mod tests;

pub use anchor::{
    Anchor, DepositOutcome, IdentityAnchor, PlainAnchor, TransactOutcome, TransactRequest,
    WithdrawRequest, encode_withdraw_calldata,
};
pub use assembler::{TransactionAssembler, UtxoSide};
pub use edges::{Edge, EdgeTable};
pub use error::{AnchorError, AnchorResult};
pub use ext_data::ExtData;
pub use inputs::{IdentityWitness, WithdrawWitness, Witness};
pub use metrics::{MetricsCollector, MetricsSummary};
pub use proof::{Groth16Proof, create_roots_bytes, split_words};
pub use public_inputs::{
    CircuitArity, IdentityPublicInputs, decode_transact_calldata, encode_transact_calldata,
};
pub use services::{FullProof, LedgerCall, LedgerClient, ProofService, Receipt};
pub use state::AnchorState;
