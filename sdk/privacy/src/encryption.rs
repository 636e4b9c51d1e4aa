//! Output Encryption
//!
//! Encrypts output note data for the recipient using ECDH + ChaCha20-Poly1305.
//! The ciphertext travels inside the transaction's external data unmodified.
//!
//! ```text
//! Flow:
//! 1. Sender generates ephemeral keypair (epk, esk)
//! 2. Shared secret = ECDH(esk, recipient_pk)
//! 3. Encryption key = KDF(shared_secret || epk, "vanchor-output-v1")
//! 4. Ciphertext = ChaCha20-Poly1305(key, nonce, plaintext)
//! 5. Output = epk || nonce || ciphertext || tag
//! ```

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::element::Element;
use crate::error::PrivacyError;

/// Plaintext length: chain id (8) + amount (16) + blinding (32)
const PLAINTEXT_LEN: usize = 8 + 16 + 32;

/// An encrypted output (attached to external data)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedOutput {
    /// Ephemeral public key for ECDH
    pub ephemeral_pk: [u8; 32],
    /// Nonce for ChaCha20-Poly1305
    pub nonce: [u8; 12],
    /// Encrypted note data with authentication tag
    pub ciphertext: Vec<u8>,
}

/// Decrypted contents of an output note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPlaintext {
    pub chain_id: u64,
    pub amount: u128,
    pub blinding: Element,
}

impl EncryptedOutput {
    /// Fixed overhead: epk + nonce + tag
    pub const OVERHEAD: usize = 32 + 12 + 16;

    /// Wire form: `epk || nonce || ciphertext`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(32 + 12 + self.ciphertext.len());
        bytes.extend_from_slice(&self.ephemeral_pk);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrivacyError> {
        if bytes.len() < Self::OVERHEAD {
            return Err(PrivacyError::DecryptionFailed);
        }
        let mut ephemeral_pk = [0u8; 32];
        ephemeral_pk.copy_from_slice(&bytes[..32]);
        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&bytes[32..44]);

        Ok(Self {
            ephemeral_pk,
            nonce,
            ciphertext: bytes[44..].to_vec(),
        })
    }
}

/// Encrypt output data for a recipient's X25519 public key
pub fn encrypt_output<R: RngCore + CryptoRng>(
    plaintext: &OutputPlaintext,
    recipient_pk: &[u8; 32],
    rng: &mut R,
) -> Result<EncryptedOutput, PrivacyError> {
    let ephemeral_secret = EphemeralSecret::random_from_rng(&mut *rng);
    let ephemeral_pk = PublicKey::from(&ephemeral_secret);

    // ECDH shared secret
    let recipient_key = PublicKey::from(*recipient_pk);
    let shared_secret = ephemeral_secret.diffie_hellman(&recipient_key);

    let encryption_key = derive_output_key(shared_secret.as_bytes(), ephemeral_pk.as_bytes());

    let mut nonce_bytes = [0u8; 12];
    rng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(&encryption_key)
        .map_err(|_| PrivacyError::EncryptionFailed)?;

    let ciphertext = cipher
        .encrypt(nonce, serialize_plaintext(plaintext).as_slice())
        .map_err(|_| PrivacyError::EncryptionFailed)?;

    Ok(EncryptedOutput {
        ephemeral_pk: *ephemeral_pk.as_bytes(),
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt an output with the recipient's X25519 secret
pub fn decrypt_output(
    encrypted: &EncryptedOutput,
    recipient_sk: &StaticSecret,
) -> Result<OutputPlaintext, PrivacyError> {
    let ephemeral_pk = PublicKey::from(encrypted.ephemeral_pk);
    let shared_secret = recipient_sk.diffie_hellman(&ephemeral_pk);

    let decryption_key = derive_output_key(shared_secret.as_bytes(), &encrypted.ephemeral_pk);

    let cipher = ChaCha20Poly1305::new_from_slice(&decryption_key)
        .map_err(|_| PrivacyError::DecryptionFailed)?;
    let nonce = Nonce::from_slice(&encrypted.nonce);

    let plaintext_bytes = cipher
        .decrypt(nonce, encrypted.ciphertext.as_slice())
        .map_err(|_| PrivacyError::DecryptionFailed)?;

    deserialize_plaintext(&plaintext_bytes)
}

/// Derive encryption key from shared secret
fn derive_output_key(shared_secret: &[u8], ephemeral_pk: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key("vanchor-output-v1");
    hasher.update(shared_secret);
    hasher.update(ephemeral_pk);
    *hasher.finalize().as_bytes()
}

fn serialize_plaintext(pt: &OutputPlaintext) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(PLAINTEXT_LEN);
    bytes.extend_from_slice(&pt.chain_id.to_be_bytes());
    bytes.extend_from_slice(&pt.amount.to_be_bytes());
    bytes.extend_from_slice(pt.blinding.as_bytes());
    bytes
}

fn deserialize_plaintext(bytes: &[u8]) -> Result<OutputPlaintext, PrivacyError> {
    if bytes.len() != PLAINTEXT_LEN {
        return Err(PrivacyError::DecryptionFailed);
    }

    let mut chain_id = [0u8; 8];
    chain_id.copy_from_slice(&bytes[0..8]);
    let mut amount = [0u8; 16];
    amount.copy_from_slice(&bytes[8..24]);
    let mut blinding = [0u8; 32];
    blinding.copy_from_slice(&bytes[24..56]);

    Ok(OutputPlaintext {
        chain_id: u64::from_be_bytes(chain_id),
        amount: u128::from_be_bytes(amount),
        blinding: Element(blinding),
    })
}
