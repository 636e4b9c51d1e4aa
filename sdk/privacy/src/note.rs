//! Shielded Notes
//!
//! Two note shapes exist side by side:
//!
//! ```text
//! Utxo = {
//!     chain_id: u64,        // Destination chain (typed chain id)
//!     amount: u128,         // Amount in the smallest unit
//!     keypair: Keypair,     // Owner
//!     blinding: Element,    // Blinding factor
//!     index: i64,           // Leaf index, -1 until inserted
//! }
//!
//! DepositNote = {
//!     chain_id: u64,
//!     nullifier: Element,   // Nullifier seed
//!     secret: Element,
//! }
//! ```
//!
//! Zero-amount UTXOs are dummies: they pad fixed-arity circuits and never
//! need a real membership proof.

use std::collections::HashSet;
use std::fmt;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::commitment::CommitmentScheme;
use crate::element::{Element, MAX_SAFE_RANDOM_BYTES};
use crate::encryption::{EncryptedOutput, OutputPlaintext, decrypt_output, encrypt_output};
use crate::error::PrivacyError;
use crate::keys::Keypair;

/// Default byte length of sampled secrets and blinding factors
pub const DEFAULT_SECRET_LEN: usize = 31;

/// Index of a note that has not been inserted yet
pub const UNINSERTED_INDEX: i64 = -1;

/// A variable-amount shielded note
#[derive(Clone)]
pub struct Utxo {
    chain_id: u64,
    amount: u128,
    keypair: Keypair,
    blinding: Element,
    commitment: Element,
    index: i64,
    scheme: CommitmentScheme,
}

impl Utxo {
    /// Create a note with explicit blinding (for transfers and recovery)
    pub fn new(
        scheme: &CommitmentScheme,
        chain_id: u64,
        amount: u128,
        keypair: Keypair,
        blinding: Element,
    ) -> Self {
        let commitment = scheme.commit_utxo(chain_id, amount, &keypair.public_key(), &blinding);
        Self {
            chain_id,
            amount,
            keypair,
            blinding,
            commitment,
            index: UNINSERTED_INDEX,
            scheme: scheme.clone(),
        }
    }

    /// Create a note with fresh blinding; a random owner is generated if none is given
    pub fn generate<R: RngCore + CryptoRng>(
        scheme: &CommitmentScheme,
        rng: &mut R,
        chain_id: u64,
        amount: u128,
        keypair: Option<Keypair>,
        blinding_len: usize,
    ) -> Result<Self, PrivacyError> {
        let keypair = match keypair {
            Some(kp) => kp,
            None => Keypair::random(rng, scheme.hasher().as_ref())?,
        };
        let blinding = Element::random(rng, blinding_len)?;
        Ok(Self::new(scheme, chain_id, amount, keypair, blinding))
    }

    /// Zero-amount padding note owned by a throwaway key
    pub fn dummy<R: RngCore + CryptoRng>(
        scheme: &CommitmentScheme,
        rng: &mut R,
        chain_id: u64,
    ) -> Result<Self, PrivacyError> {
        Self::generate(scheme, rng, chain_id, 0, None, MAX_SAFE_RANDOM_BYTES)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn amount(&self) -> u128 {
        self.amount
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn public_key(&self) -> Element {
        self.keypair.public_key()
    }

    pub fn blinding(&self) -> Element {
        self.blinding
    }

    pub fn commitment(&self) -> Element {
        self.commitment
    }

    /// Leaf index, or -1 if the note is not in the tree
    pub fn index(&self) -> i64 {
        self.index
    }

    /// Set the Merkle tree position (called after insertion)
    pub fn set_index(&mut self, index: u32) {
        self.index = i64::from(index);
    }

    /// Builder form of [`Utxo::set_index`]
    pub fn with_index(mut self, index: u32) -> Self {
        self.set_index(index);
        self
    }

    /// Check if this note has been inserted into the tree
    pub fn is_inserted(&self) -> bool {
        self.index >= 0
    }

    pub fn is_dummy(&self) -> bool {
        self.amount == 0
    }

    /// Derive the nullifier for spending this note.
    ///
    /// Uninserted notes (dummies) derive at index 0.
    pub fn nullifier(&self) -> Result<Element, PrivacyError> {
        let nk = self.keypair.nullifier_key(self.scheme.hasher().clone())?;
        let index = u32::try_from(self.index.max(0)).unwrap_or(u32::MAX);
        Ok(nk.derive_nullifier(&self.commitment, index))
    }

    /// Encrypt chain id, amount, and blinding to the owner's encryption key
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<EncryptedOutput, PrivacyError> {
        let recipient_pk = self
            .keypair
            .encryption_public_key()
            .ok_or(PrivacyError::MissingEncryptionKey)?;

        let plaintext = OutputPlaintext {
            chain_id: self.chain_id,
            amount: self.amount,
            blinding: self.blinding,
        };
        encrypt_output(&plaintext, &recipient_pk, rng)
    }

    /// Recover a note addressed to `keypair` from its ciphertext
    pub fn decrypt(
        scheme: &CommitmentScheme,
        keypair: Keypair,
        encrypted: &[u8],
        index: u32,
    ) -> Result<Self, PrivacyError> {
        let encrypted = EncryptedOutput::from_bytes(encrypted)?;
        let plaintext = decrypt_output(&encrypted, keypair.encryption_secret()?)?;

        Ok(Self::new(
            scheme,
            plaintext.chain_id,
            plaintext.amount,
            keypair,
            plaintext.blinding,
        )
        .with_index(index))
    }
}

impl PartialEq for Utxo {
    fn eq(&self, other: &Self) -> bool {
        self.commitment == other.commitment && self.index == other.index
    }
}

impl fmt::Debug for Utxo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Utxo")
            .field("chain_id", &self.chain_id)
            .field("amount", &self.amount)
            .field("commitment", &self.commitment)
            .field("index", &self.index)
            .finish()
    }
}

/// A fixed-denomination deposit note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositNote {
    pub chain_id: u64,
    pub nullifier: Element,
    pub secret: Element,
    pub commitment: Element,
    pub nullifier_hash: Element,
}

impl DepositNote {
    /// Rebuild a note from its secret material
    pub fn from_secrets(
        scheme: &CommitmentScheme,
        chain_id: u64,
        nullifier: Element,
        secret: Element,
    ) -> Self {
        Self {
            chain_id,
            nullifier,
            secret,
            commitment: scheme.commit_deposit(chain_id, &nullifier, &secret),
            nullifier_hash: scheme.deposit_nullifier_hash(&nullifier),
        }
    }

    /// Sample a new deposit note
    pub fn generate<R: RngCore + CryptoRng>(
        scheme: &CommitmentScheme,
        rng: &mut R,
        chain_id: u64,
        secret_len: usize,
        nullifier_len: usize,
    ) -> Result<Self, PrivacyError> {
        let secret = Element::random(rng, secret_len)?;
        let nullifier = Element::random(rng, nullifier_len)?;
        Ok(Self::from_secrets(scheme, chain_id, nullifier, secret))
    }
}

/// Note factory that refuses to hand out reused secret material.
///
/// Every sampled secret, nullifier seed, and blinding factor is remembered;
/// a repeat means the rng is broken and is reported as
/// [`PrivacyError::DuplicateSecret`].
#[derive(Debug)]
pub struct NoteGenerator {
    scheme: CommitmentScheme,
    secret_len: usize,
    blinding_len: usize,
    issued: HashSet<Element>,
}

impl NoteGenerator {
    pub fn new(scheme: CommitmentScheme) -> Self {
        Self {
            scheme,
            secret_len: DEFAULT_SECRET_LEN,
            blinding_len: DEFAULT_SECRET_LEN,
            issued: HashSet::new(),
        }
    }

    /// Override the sampled byte lengths (each 1..=31)
    pub fn with_lengths(mut self, secret_len: usize, blinding_len: usize) -> Result<Self, PrivacyError> {
        for len in [secret_len, blinding_len] {
            if len == 0 || len > MAX_SAFE_RANDOM_BYTES {
                return Err(PrivacyError::InvalidRandomLength(len));
            }
        }
        self.secret_len = secret_len;
        self.blinding_len = blinding_len;
        Ok(self)
    }

    pub fn scheme(&self) -> &CommitmentScheme {
        &self.scheme
    }

    /// Number of secret values issued so far
    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    pub fn generate_deposit<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        chain_id: u64,
    ) -> Result<DepositNote, PrivacyError> {
        let note = DepositNote::generate(&self.scheme, rng, chain_id, self.secret_len, self.secret_len)?;
        self.track(note.nullifier)?;
        self.track(note.secret)?;
        Ok(note)
    }

    pub fn generate_utxo<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        chain_id: u64,
        amount: u128,
        keypair: Option<Keypair>,
    ) -> Result<Utxo, PrivacyError> {
        let utxo = Utxo::generate(&self.scheme, rng, chain_id, amount, keypair, self.blinding_len)?;
        self.track(utxo.blinding())?;
        Ok(utxo)
    }

    fn track(&mut self, material: Element) -> Result<(), PrivacyError> {
        if !self.issued.insert(material) {
            return Err(PrivacyError::DuplicateSecret(material.to_fixed_hex()));
        }
        Ok(())
    }
}
