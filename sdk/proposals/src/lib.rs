//! VAnchor Proposals
//!
//! Deterministic byte layouts shared by every linked anchor: typed chain
//! ids, resource identifiers, and governance proposal payloads. Pure
//! functions only; the single failure mode is malformed input.

pub mod chain;
pub mod error;
pub mod fixed_hex;
pub mod proposal;
pub mod resource;

pub use chain::{ChainType, TypedChainId};
pub use error::EncodingError;
pub use proposal::{AnchorUpdate, HEADER_LEN, Proposal, ProposalKind, function_selector};
pub use resource::{Address, ResourceId};
