//! Shielded Keypairs
//!
//! A note owner is identified by `public_key = H(private_key)`. Output
//! ciphertexts are addressed to a separate X25519 key derived from the same
//! private key, so one secret restores both capabilities.

use std::fmt;
use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::element::{Element, MAX_SAFE_RANDOM_BYTES};
use crate::error::PrivacyError;
use crate::hasher::FieldHasher;
use crate::nullifier::NullifierKey;

const ENCRYPTION_KEY_CONTEXT: &str = "vanchor-keypair-encryption-v1";

/// A note owner's keys.
/// The private half is absent for keypairs built from a public key only.
#[derive(Clone)]
pub struct Keypair {
    private_key: Option<Element>,
    public_key: Element,
    encryption_secret: Option<StaticSecret>,
    encryption_key: Option<X25519PublicKey>,
}

impl Keypair {
    /// Generate a fresh keypair from a secure rng
    pub fn random<R: RngCore + CryptoRng>(
        rng: &mut R,
        hasher: &dyn FieldHasher,
    ) -> Result<Self, PrivacyError> {
        let private_key = Element::random(rng, MAX_SAFE_RANDOM_BYTES)?;
        Ok(Self::from_private_key(private_key, hasher))
    }

    /// Restore a keypair from its private key
    pub fn from_private_key(private_key: Element, hasher: &dyn FieldHasher) -> Self {
        let public_key = hasher.hash(&[private_key]);
        let seed = blake3::derive_key(ENCRYPTION_KEY_CONTEXT, private_key.as_bytes());
        let encryption_secret = StaticSecret::from(seed);
        let encryption_key = X25519PublicKey::from(&encryption_secret);

        Self {
            private_key: Some(private_key),
            public_key,
            encryption_secret: Some(encryption_secret),
            encryption_key: Some(encryption_key),
        }
    }

    /// Public-only keypair, e.g. a transfer recipient
    pub fn from_public(public_key: Element, encryption_key: Option<[u8; 32]>) -> Self {
        Self {
            private_key: None,
            public_key,
            encryption_secret: None,
            encryption_key: encryption_key.map(X25519PublicKey::from),
        }
    }

    pub fn public_key(&self) -> Element {
        self.public_key
    }

    pub fn private_key(&self) -> Option<Element> {
        self.private_key
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// X25519 key that output ciphertexts are addressed to
    pub fn encryption_public_key(&self) -> Option<[u8; 32]> {
        self.encryption_key.map(|pk| pk.to_bytes())
    }

    pub(crate) fn encryption_secret(&self) -> Result<&StaticSecret, PrivacyError> {
        self.encryption_secret
            .as_ref()
            .ok_or(PrivacyError::MissingPrivateKey)
    }

    /// Nullifier key for notes owned by this keypair
    pub fn nullifier_key(
        &self,
        hasher: Arc<dyn FieldHasher>,
    ) -> Result<NullifierKey, PrivacyError> {
        let private_key = self.private_key.ok_or(PrivacyError::MissingPrivateKey)?;
        Ok(NullifierKey::new(private_key, hasher))
    }
}

impl PartialEq for Keypair {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

impl Eq for Keypair {}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::PoseidonHasher;
    use rand::rngs::OsRng;

    #[test]
    fn test_key_derivation() {
        let hasher = PoseidonHasher::new();
        let kp = Keypair::random(&mut OsRng, &hasher).unwrap();

        // Same private key should derive same public and encryption keys
        let restored = Keypair::from_private_key(kp.private_key().unwrap(), &hasher);
        assert_eq!(kp.public_key(), restored.public_key());
        assert_eq!(kp.encryption_public_key(), restored.encryption_public_key());
    }

    #[test]
    fn test_public_only_keypair() {
        let hasher = PoseidonHasher::new();
        let kp = Keypair::random(&mut OsRng, &hasher).unwrap();
        let public = Keypair::from_public(kp.public_key(), kp.encryption_public_key());

        assert!(!public.has_private_key());
        assert_eq!(public, kp);
        assert!(matches!(
            public.nullifier_key(Arc::new(PoseidonHasher::new())),
            Err(PrivacyError::MissingPrivateKey)
        ));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let hasher = PoseidonHasher::new();
        let kp = Keypair::from_private_key(Element::from_u64(31337), &hasher);
        let rendered = format!("{kp:?}");
        assert!(!rendered.contains(&Element::from_u64(31337).to_fixed_hex()));
    }
}
