use thiserror::Error;

/// Byte-layout errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("encoding length mismatch: expected {expected} bytes, got {actual}")]
    EncodingLengthMismatch { expected: usize, actual: usize },

    #[error("unknown function selector 0x{}", hex::encode(.0))]
    UnknownSelector([u8; 4]),

    #[error("unknown chain type 0x{0:04x}")]
    UnknownChainType(u16),

    #[error("value does not fit in {0} bytes")]
    ValueOverflow(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
