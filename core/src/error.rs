use std::time::Duration;

use thiserror::Error;
use vanchor_privacy::{MerkleError, PrivacyError};
use vanchor_proposals::EncodingError;

pub type AnchorResult<T> = std::result::Result<T, AnchorError>;

/// Anchor client errors
#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("tree is full: capacity {capacity}")]
    CapacityExceeded { capacity: u64 },

    #[error("leaf index {index} out of range (tree holds {len} leaves)")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("commitment {0} not found in tree")]
    CommitmentNotFound(String),

    #[error("{given} inputs exceed the largest circuit arity {arity}")]
    TooManyInputs { given: usize, arity: usize },

    #[error("{given} outputs exceed the circuit arity {arity}")]
    TooManyOutputs { given: usize, arity: usize },

    #[error("no edge for chain {0:#x}")]
    UnknownEdge(u64),

    #[error("edge table is full ({max} edges)")]
    EdgeCapacityExceeded { max: usize },

    #[error("no root recorded for leaf index {0}")]
    NoHistoryForIndex(u32),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("public signal count mismatch: expected {expected}, got {actual}")]
    SignalCountMismatch { expected: usize, actual: usize },

    #[error("proof public input `{0}` does not match the assembled transaction")]
    PublicInputMismatch(&'static str),

    #[error("local proof verification failed")]
    ProofVerificationFailed,

    #[error("candidate root {candidate} is not known to the ledger")]
    RootMismatch { candidate: String },

    #[error("{0} is not supported by this anchor")]
    UnimplementedOperation(&'static str),

    #[error("identity {0} is not a group member")]
    MemberNotFound(String),

    #[error("ledger reports chain {actual:#x}, expected {expected:#x}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("amount overflow while computing the external amount")]
    AmountOverflow,

    #[error("proof generation timed out after {0:?}")]
    ProverTimeout(Duration),

    #[error(transparent)]
    Privacy(PrivacyError),

    /// Ledger client failure, propagated unchanged
    #[error(transparent)]
    Ledger(anyhow::Error),

    /// Proof service failure, propagated unchanged
    #[error(transparent)]
    ProofService(anyhow::Error),
}

impl From<MerkleError> for AnchorError {
    fn from(err: MerkleError) -> Self {
        match err {
            MerkleError::CapacityExceeded { capacity } => AnchorError::CapacityExceeded { capacity },
            MerkleError::IndexOutOfRange { index, len } => AnchorError::IndexOutOfRange { index, len },
            MerkleError::CommitmentNotFound(c) => AnchorError::CommitmentNotFound(c),
            other @ MerkleError::InvalidDepth(_) => AnchorError::Privacy(PrivacyError::Merkle(other)),
        }
    }
}

impl From<PrivacyError> for AnchorError {
    fn from(err: PrivacyError) -> Self {
        match err {
            PrivacyError::Merkle(e) => e.into(),
            PrivacyError::MemberNotFound(pk) => AnchorError::MemberNotFound(pk),
            other => AnchorError::Privacy(other),
        }
    }
}
