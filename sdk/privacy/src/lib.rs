//! VAnchor Privacy SDK
//!
//! Note-based privacy primitives for shielded cross-chain transfers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Shielded Transaction                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifiers  │  │ Commitments  │  │   Encrypted Outputs   │ │
//! │  │  (spent)     │  │  (new notes) │  │   (for recipient)     │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │  Merkle accumulator (commitments)                        │   │
//! │  │  Identity group (member public keys)                     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod element;
pub mod encryption;
pub mod error;
pub mod hasher;
pub mod identity;
pub mod keys;
pub mod merkle;
pub mod note;
pub mod nullifier;

pub use commitment::CommitmentScheme;
pub use element::{Element, MAX_SAFE_RANDOM_BYTES};
pub use encryption::{EncryptedOutput, OutputPlaintext, decrypt_output, encrypt_output};
pub use error::{MerkleError, PrivacyError};
pub use hasher::{FieldHasher, PoseidonHasher, default_zero_leaf};
pub use identity::IdentityGroup;
pub use keys::Keypair;
pub use merkle::{DEFAULT_ROOT_HISTORY_SIZE, MAX_TREE_DEPTH, MerklePath, MerkleTree, RootHistory};
pub use note::{DEFAULT_SECRET_LEN, DepositNote, NoteGenerator, UNINSERTED_INDEX, Utxo};
pub use nullifier::NullifierKey;
