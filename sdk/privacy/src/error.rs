use thiserror::Error;

/// Merkle accumulator errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    #[error("tree is full: capacity {capacity}")]
    CapacityExceeded { capacity: u64 },

    #[error("leaf index {index} out of range (tree holds {len} leaves)")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("commitment {0} not found in tree")]
    CommitmentNotFound(String),

    #[error("invalid tree depth {0} (expected 1..=32)")]
    InvalidDepth(usize),
}

/// Note, key, and identity errors
#[derive(Debug, Error)]
pub enum PrivacyError {
    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error("random secret material reused: {0}")]
    DuplicateSecret(String),

    #[error("invalid random byte length {0} (expected 1..=31)")]
    InvalidRandomLength(usize),

    #[error("keypair has no private key")]
    MissingPrivateKey,

    #[error("keypair has no encryption key")]
    MissingEncryptionKey,

    #[error("note encryption failed")]
    EncryptionFailed,

    #[error("note decryption failed")]
    DecryptionFailed,

    #[error("identity {0} is not a group member")]
    MemberNotFound(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
